use tracing::{trace, warn};
use tree_sitter::{Node, Parser as TSParser};

use crate::ast::{AstNode, AstNodeList, Placeholder, Transclusion};

pub struct Parser {
    source: String,
}

impl Parser {
    pub fn new(source: &str) -> Self {
        Parser {
            source: source.to_string(),
        }
    }

    pub fn parse(&mut self) -> AstNodeList {
        // Most messages carry no magic words
        if !self.source.contains("{{") {
            return extract_placeholders(&self.source);
        }

        let mut ts_parser = TSParser::new();
        if let Err(e) = ts_parser.set_language(&tree_sitter_wikitext::LANGUAGE.into()) {
            warn!("Error loading wikitext grammar: {}", e);
            return extract_placeholders(&self.source);
        }

        let Some(tree) = ts_parser.parse(&self.source, None) else {
            warn!("Failed to parse wikitext message, treating it as plain text");
            return extract_placeholders(&self.source);
        };
        let root = tree.root_node();
        trace!("Parse tree s-expression: {}", root.to_sexp());

        let mut functions = Vec::new();
        collect_parser_functions(root, &mut functions);

        // Everything between magic words is copied verbatim from the source,
        // so whitespace the grammar treats as extras is never lost.
        let mut nodes = Vec::new();
        let mut position = 0;
        for node in functions {
            let Some(transclusion) = self.parse_parser_function(node) else {
                continue;
            };
            nodes.extend(extract_placeholders(self.slice(position, node.start_byte())));
            nodes.push(AstNode::Transclusion(transclusion));
            position = node.end_byte();
        }
        nodes.extend(extract_placeholders(self.slice(position, self.source.len())));
        nodes
    }

    fn slice(&self, start: usize, end: usize) -> &str {
        self.source.get(start..end).unwrap_or("")
    }

    fn parse_parser_function(&self, node: Node) -> Option<Transclusion> {
        // parser_function
        //   -> parser_function_colon
        //      -> parser_function_name ("PLURAL")
        //      -> function_delimiter (":")
        //      -> param_text ("$1")
        //      -> template_argument ("is")
        //      -> template_argument ("are")
        let mut cursor = node.walk();
        let colon = node
            .children(&mut cursor)
            .find(|child| child.kind() == "parser_function_colon");
        let Some(colon) = colon else {
            warn!(
                "Failed to parse parser function, keeping it as text: {}",
                self.node_text(node)
            );
            return None;
        };

        let name = self.child_text(colon, "parser_function_name")?;
        let param = self.child_text(colon, "param_text")?;

        let mut options = Vec::new();
        let mut cursor = colon.walk();
        for argument in colon.children(&mut cursor) {
            if argument.kind() != "template_argument" {
                continue;
            }
            let mut arg_cursor = argument.walk();
            let text = argument
                .children(&mut arg_cursor)
                .find(|child| child.kind() == "template_param_value")
                .map(|value| self.node_text(value))
                .unwrap_or_else(|| self.node_text(argument));
            options.push(text.trim().to_string());
        }

        Some(Transclusion {
            name,
            param,
            options,
        })
    }

    fn child_text(&self, node: Node, kind: &str) -> Option<String> {
        let mut cursor = node.walk();
        node.children(&mut cursor)
            .find(|child| child.kind() == kind)
            .map(|child| self.node_text(child).trim().to_string())
    }

    fn node_text(&self, node: Node) -> String {
        node.utf8_text(self.source.as_bytes())
            .unwrap_or("")
            .to_string()
    }
}

fn collect_parser_functions<'tree>(node: Node<'tree>, found: &mut Vec<Node<'tree>>) {
    if node.kind() == "parser_function" {
        found.push(node);
        return;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_parser_functions(child, found);
    }
}

/// Split plain text on `$n` placeholders.
pub fn extract_placeholders(text: &str) -> AstNodeList {
    let mut nodes = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' {
            current.push(ch);
            continue;
        }
        let mut digits = String::new();
        while let Some(next) = chars.peek().copied().filter(char::is_ascii_digit) {
            digits.push(next);
            chars.next();
        }
        match digits.parse::<usize>() {
            Ok(index) => {
                if !current.is_empty() {
                    nodes.push(AstNode::Text(std::mem::take(&mut current)));
                }
                nodes.push(AstNode::Placeholder(Placeholder { index }));
            }
            Err(_) => {
                current.push('$');
                current.push_str(&digits);
            }
        }
    }

    if !current.is_empty() {
        nodes.push(AstNode::Text(current));
    }
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_plain_text() {
        let ast = Parser::new("Hello, World!").parse();
        assert_eq!(ast, vec![AstNode::Text("Hello, World!".to_string())]);
    }

    #[test]
    fn test_placeholders() {
        let ast = Parser::new("Invalid target \"$1\": $2").parse();
        assert_eq!(
            ast,
            vec![
                AstNode::Text("Invalid target \"".to_string()),
                AstNode::Placeholder(Placeholder { index: 1 }),
                AstNode::Text("\": ".to_string()),
                AstNode::Placeholder(Placeholder { index: 2 }),
            ]
        );
    }

    #[test]
    fn test_lone_dollar_is_text() {
        let ast = Parser::new("costs $ and $x").parse();
        assert_eq!(ast, vec![AstNode::Text("costs $ and $x".to_string())]);
    }

    #[test]
    fn test_plural_magic_word() {
        let ast = Parser::new("{{PLURAL:$1|is|are}}").parse();
        let transclusion = ast.iter().find_map(|node| match node {
            AstNode::Transclusion(t) => Some(t),
            _ => None,
        });
        match transclusion {
            Some(t) => {
                assert_eq!(t.name, "PLURAL");
                assert_eq!(t.param, "$1");
                assert_eq!(t.options, vec!["is", "are"]);
            }
            None => panic!("Expected transclusion in AST: {:?}", ast),
        }
    }
}
