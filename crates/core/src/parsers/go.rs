use tree_sitter::{Node, Parser, Point};

use super::{ParserError, UnitHeader};

pub struct GoParser {
    parser: Parser,
}

impl GoParser {
    pub fn new() -> Result<Self, ParserError> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_go::LANGUAGE.into())
            .map_err(|e| ParserError::InitError(e.to_string()))?;

        Ok(Self { parser })
    }

    /// Parse source text into its package name and import paths.
    ///
    /// Any syntax error, or a missing package clause, is reported as
    /// `ParserError::Syntax`.
    pub fn parse(&mut self, source: &str) -> Result<UnitHeader, ParserError> {
        let tree = self
            .parser
            .parse(source, None)
            .ok_or_else(|| ParserError::Syntax("parser produced no tree".to_string()))?;
        let root = tree.root_node();

        if root.has_error() {
            let location = first_error(root)
                .map(|p| format!(" at line {}, column {}", p.row + 1, p.column + 1))
                .unwrap_or_default();
            return Err(ParserError::Syntax(format!("syntax error{}", location)));
        }

        let mut package_name = None;
        let mut imports = Vec::new();

        // Package and import declarations only appear at the top level.
        let mut cursor = root.walk();
        for child in root.children(&mut cursor) {
            match child.kind() {
                "package_clause" => {
                    package_name = self.parse_package_clause(&child, source);
                }
                "import_declaration" => {
                    self.parse_import_declaration(&child, source, &mut imports);
                }
                _ => {}
            }
        }

        let package_name = package_name
            .ok_or_else(|| ParserError::Syntax("missing package clause".to_string()))?;

        Ok(UnitHeader {
            package_name,
            imports,
        })
    }

    fn parse_package_clause(&self, node: &Node, source: &str) -> Option<String> {
        let mut cursor = node.walk();
        let name = node
            .children(&mut cursor)
            .find(|child| child.kind() == "package_identifier")
            .map(|child| self.get_node_text(&child, source));
        name
    }

    /// `import "x"` or `import ( ... )`
    fn parse_import_declaration(&self, node: &Node, source: &str, imports: &mut Vec<String>) {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "import_spec" => self.parse_import_spec(&child, source, imports),
                "import_spec_list" => {
                    let mut nested_cursor = child.walk();
                    for nested in child.children(&mut nested_cursor) {
                        if nested.kind() == "import_spec" {
                            self.parse_import_spec(&nested, source, imports);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    /// Aliased, dot and blank imports are all recorded by path
    fn parse_import_spec(&self, node: &Node, source: &str, imports: &mut Vec<String>) {
        if let Some(path) = node.child_by_field_name("path") {
            let literal = self.get_node_text(&path, source);
            imports.push(literal.trim_matches(|c| c == '"' || c == '`').to_string());
        }
    }

    fn get_node_text(&self, node: &Node, source: &str) -> String {
        source[node.byte_range()].to_string()
    }
}

/// Position of the first error or missing node, depth first
fn first_error(node: Node) -> Option<Point> {
    if node.is_error() || node.is_missing() {
        return Some(node.start_position());
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.has_error() {
            if let Some(point) = first_error(child) {
                return Some(point);
            }
        }
    }
    None
}
