use super::*;

fn find<'a>(file: &'a CodeFile, name: &str) -> &'a Symbol {
    file.symbols
        .iter()
        .find(|s| s.name == name)
        .unwrap_or_else(|| panic!("symbol {} not found in {:?}", name, file.symbols))
}

fn targets(file: &CodeFile) -> Vec<&str> {
    file.imports.iter().map(|i| i.target.as_str()).collect()
}

const PYTHON_SOURCE: &str = r#"import os
from .models import User
from . import helpers

MAX_RETRIES = 3
counter = 0

class Service(Base):
    """Handles requests."""

    def handle(self, request):
        return request

def main():
    pass
"#;

#[test]
fn test_python_symbols() {
    let file = parse(PYTHON_SOURCE, "app/service.py");
    assert_eq!(file.language, Language::Python);

    let retries = find(&file, "MAX_RETRIES");
    assert_eq!(retries.kind, SymbolKind::Constant);
    assert_eq!(retries.start_line, 5);
    assert_eq!(retries.end_line, Some(5));

    assert_eq!(find(&file, "counter").kind, SymbolKind::Variable);

    let service = find(&file, "Service");
    assert_eq!(service.kind, SymbolKind::Class);
    assert_eq!(service.start_line, 8);
    assert_eq!(service.end_line, Some(12));
    assert_eq!(service.bases, vec!["Base"]);
    assert_eq!(service.docstring.as_deref(), Some("Handles requests."));

    let main = find(&file, "main");
    assert_eq!(main.kind, SymbolKind::Function);
    assert_eq!(main.scope, None);
    assert_eq!(main.signature.as_deref(), Some("def main()"));
}

#[test]
fn test_python_class_body_rescopes_functions_to_methods() {
    let file = parse(PYTHON_SOURCE, "app/service.py");
    let handle = find(&file, "handle");
    assert_eq!(handle.kind, SymbolKind::Method);
    assert_eq!(handle.scope.as_deref(), Some("Service"));
    assert_eq!(handle.start_line, 11);
    assert_eq!(handle.end_line, Some(12));
    assert_eq!(handle.signature.as_deref(), Some("def handle(self, request)"));
}

#[test]
fn test_python_imports() {
    let file = parse(PYTHON_SOURCE, "app/service.py");
    assert_eq!(targets(&file), vec!["os", ".models", ".helpers"]);
}

#[test]
fn test_python_private_names() {
    let file = parse("def _hidden():\n    return 1\n", "m.py");
    assert_eq!(find(&file, "_hidden").visibility, Some(Visibility::Private));
}

#[test]
fn test_malformed_python_yields_no_symbols() {
    let file = parse("def broken(:\n    pass\n", "broken.py");
    assert_eq!(file.language, Language::Python);
    assert!(file.symbols.is_empty());
}

#[test]
fn test_empty_content() {
    let file = parse("", "empty.py");
    assert!(file.symbols.is_empty());
    assert!(file.imports.is_empty());

    let file = parse("   \n\n", "blank.rs");
    assert!(file.symbols.is_empty());
}

#[test]
fn test_javascript_symbols_and_imports() {
    let source = r#"import { a } from './a';
const helper = require('./helper');
const MAX = 10;

class Widget extends Base {
  render() {
    return 1;
  }
}

export function build(x) {
  return x;
}

const arrow = (y) => y * 2;
"#;
    let file = parse(source, "src/widget.js");
    assert_eq!(file.language, Language::JavaScript);
    assert_eq!(targets(&file), vec!["./a", "./helper"]);

    assert_eq!(find(&file, "helper").kind, SymbolKind::Variable);
    assert_eq!(find(&file, "MAX").kind, SymbolKind::Constant);

    let widget = find(&file, "Widget");
    assert_eq!(widget.kind, SymbolKind::Class);
    assert_eq!(widget.end_line, Some(9));
    assert_eq!(widget.bases, vec!["Base"]);

    let render = find(&file, "render");
    assert_eq!(render.kind, SymbolKind::Method);
    assert_eq!(render.scope.as_deref(), Some("Widget"));
    assert_eq!(render.end_line, Some(8));

    let build = find(&file, "build");
    assert_eq!(build.kind, SymbolKind::Function);
    assert_eq!(build.end_line, Some(13));

    assert_eq!(find(&file, "arrow").kind, SymbolKind::Function);
}

#[test]
fn test_typescript_interfaces_and_enums() {
    let source = "export interface Shape {\n  area(): number;\n}\n\nenum Color {\n  Red,\n}\n\ntype Id = string;\n";
    let file = parse(source, "shapes.ts");
    assert_eq!(file.language, Language::TypeScript);
    assert_eq!(find(&file, "Shape").kind, SymbolKind::Interface);
    assert_eq!(find(&file, "Color").kind, SymbolKind::Enum);
    assert_eq!(find(&file, "Id").kind, SymbolKind::Interface);
}

#[test]
fn test_java_members() {
    let source = r#"import java.util.List;

public class Account extends Entity {
    public static final int MAX_BALANCE = 100;
    private String owner;

    public Account(String owner) {
        this.owner = owner;
    }

    public int balance() {
        return 0;
    }
}
"#;
    let file = parse(source, "Account.java");
    assert_eq!(targets(&file), vec!["java.util.List"]);

    let account = file
        .symbols
        .iter()
        .find(|s| s.name == "Account" && s.kind == SymbolKind::Class)
        .unwrap();
    assert_eq!(account.bases, vec!["Entity"]);
    assert_eq!(account.end_line, Some(14));

    assert_eq!(find(&file, "MAX_BALANCE").kind, SymbolKind::Constant);
    assert_eq!(find(&file, "owner").kind, SymbolKind::Property);

    let balance = find(&file, "balance");
    assert_eq!(balance.kind, SymbolKind::Method);
    assert_eq!(balance.scope.as_deref(), Some("Account"));
    assert_eq!(balance.visibility, Some(Visibility::Public));
    assert_eq!(balance.end_line, Some(13));
}

#[test]
fn test_c_functions_and_defines() {
    let source = "#include <stdio.h>\n#define MAX_LEN 256\n\nstruct Node {\n    int value;\n};\n\nint add(int a, int b) {\n    return a + b;\n}\n";
    let file = parse(source, "math.c");
    assert_eq!(targets(&file), vec!["stdio.h"]);
    assert_eq!(find(&file, "MAX_LEN").kind, SymbolKind::Constant);
    assert_eq!(find(&file, "Node").kind, SymbolKind::Struct);

    let add = find(&file, "add");
    assert_eq!(add.kind, SymbolKind::Function);
    assert_eq!(add.end_line, Some(10));
    assert!(file.symbols.iter().all(|s| s.name != "value"));
}

#[test]
fn test_go_receivers_and_groups() {
    let source = r#"package main

import (
	"fmt"
	"./internal/util"
)

const (
	MaxSize = 10
	DEBUG = true
)

type Server struct {
	port int
}

func (s *Server) Start() error {
	return nil
}

func main() {
	fmt.Println("hi")
}
"#;
    let file = parse(source, "main.go");
    assert_eq!(targets(&file), vec!["fmt", "./internal/util"]);

    assert_eq!(find(&file, "MaxSize").kind, SymbolKind::Constant);
    assert_eq!(find(&file, "DEBUG").kind, SymbolKind::Constant);
    assert_eq!(find(&file, "Server").kind, SymbolKind::Struct);

    let start = find(&file, "Start");
    assert_eq!(start.kind, SymbolKind::Method);
    assert_eq!(start.scope.as_deref(), Some("Server"));
    assert_eq!(start.visibility, Some(Visibility::Public));
    assert_eq!(start.end_line, Some(19));

    let main = find(&file, "main");
    assert_eq!(main.kind, SymbolKind::Function);
    assert_eq!(main.visibility, Some(Visibility::Private));
}

#[test]
fn test_rust_impl_methods() {
    let source = r#"use std::collections::HashMap;
mod helpers;

pub const LIMIT: usize = 10;

pub struct Point {
    x: i32,
}

impl Point {
    pub fn new() -> Self {
        Point { x: 0 }
    }
}

fn free() {}
"#;
    let file = parse(source, "src/point.rs");
    assert_eq!(targets(&file), vec!["std::collections::HashMap", "./helpers"]);

    assert_eq!(find(&file, "helpers").kind, SymbolKind::Module);
    assert_eq!(find(&file, "LIMIT").kind, SymbolKind::Constant);

    let point = find(&file, "Point");
    assert_eq!(point.kind, SymbolKind::Struct);
    assert_eq!(point.end_line, Some(8));

    let new = find(&file, "new");
    assert_eq!(new.kind, SymbolKind::Method);
    assert_eq!(new.scope.as_deref(), Some("Point"));
    assert_eq!(new.visibility, Some(Visibility::Public));
    assert_eq!(new.end_line, Some(13));

    let free = find(&file, "free");
    assert_eq!(free.kind, SymbolKind::Function);
    assert_eq!(free.visibility, Some(Visibility::Private));
    assert_eq!(free.end_line, Some(16));
}

#[test]
fn test_ruby_keyword_depth() {
    let source = r#"require 'json'
require_relative 'lib/helper'

module Billing
  RATE = 5

  class Invoice < Record
    attr_reader :total

    def initialize(total)
      @total = total
    end

    private

    def compute
      items.each do |i|
        i
      end
    end
  end
end

def standalone
  1
end
"#;
    let file = parse(source, "billing.rb");
    assert_eq!(targets(&file), vec!["json", "./lib/helper"]);

    let billing = find(&file, "Billing");
    assert_eq!(billing.kind, SymbolKind::Module);
    assert_eq!(billing.end_line, Some(22));

    let rate = find(&file, "RATE");
    assert_eq!(rate.kind, SymbolKind::Constant);
    assert_eq!(rate.scope.as_deref(), Some("Billing"));

    let invoice = find(&file, "Invoice");
    assert_eq!(invoice.kind, SymbolKind::Class);
    assert_eq!(invoice.bases, vec!["Record"]);
    assert_eq!(invoice.end_line, Some(21));

    assert_eq!(find(&file, "total").kind, SymbolKind::Property);

    let init = find(&file, "initialize");
    assert_eq!(init.kind, SymbolKind::Method);
    assert_eq!(init.scope.as_deref(), Some("Billing.Invoice"));
    assert_eq!(init.end_line, Some(12));

    let compute = find(&file, "compute");
    assert_eq!(compute.visibility, Some(Visibility::Private));
    assert_eq!(compute.end_line, Some(20));

    let standalone = find(&file, "standalone");
    assert_eq!(standalone.kind, SymbolKind::Function);
    assert_eq!(standalone.end_line, Some(26));
}

#[test]
fn test_unknown_extension_uses_generic_scan() {
    let source = "local count = 0\n\nfunction greet(name)\n  print(name)\nend\n";
    let file = parse(source, "script.lua");
    assert_eq!(file.language, Language::Unknown);
    assert_eq!(find(&file, "count").kind, SymbolKind::Variable);
    assert_eq!(find(&file, "greet").kind, SymbolKind::Function);
}

#[test]
fn test_symbols_sorted_and_deduplicated() {
    let file = parse(PYTHON_SOURCE, "app/service.py");
    let lines: Vec<usize> = file.symbols.iter().map(|s| s.start_line).collect();
    let mut sorted = lines.clone();
    sorted.sort();
    assert_eq!(lines, sorted);

    let mut identities: Vec<_> = file
        .symbols
        .iter()
        .map(|s| (s.name.clone(), s.kind, s.start_line))
        .collect();
    let before = identities.len();
    identities.dedup();
    assert_eq!(before, identities.len());
}
