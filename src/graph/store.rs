use super::result_parser::{Row, parse_rows};
use super::statement::{Lookup, Statement};
use anyhow::Result;
use async_trait::async_trait;

/// A property graph that accepts typed statements.
///
/// `execute` runs the whole slice as one call and returns the raw textual
/// output. A failed call fails every statement in it.
#[async_trait]
pub trait GraphStore: Send + Sync {
    async fn execute(&self, statements: &[Statement]) -> Result<String>;

    /// Remove every node and relationship
    async fn clear(&self) -> Result<()>;

    /// Run one lookup and parse its rows
    async fn lookup(&self, lookup: &Lookup) -> Result<Vec<Row>> {
        let text = self.execute(&[Statement::Lookup(lookup.clone())]).await?;
        Ok(parse_rows(&text, lookup.kind.columns()))
    }
}
