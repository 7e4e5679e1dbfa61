//! Typed syntax tree of a Helm template, as parsed by the template engine.
//!
//! The tree is built from the engine's parse tree and does not depend on the
//! template having rendered successfully, so checks can look at template
//! logic (pipelines, field accesses, function calls) without evaluating it.

mod convert;
mod visit;
pub mod wire;

pub use convert::{unpack, unpack_node};
pub use visit::{Visitor, walk_branch, walk_command, walk_list, walk_node, walk_pipe};
pub use wire::NodeType;

use serde::Serialize;

use crate::error::LocationError;
use crate::helm::location::{Location, TextRange};

/// Root of a parsed template.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tree {
    pub name: String,
    pub parse_name: String,
    pub mode: u64,
    pub root: ListNode,
}

impl Tree {
    /// Every node of the tree in depth-first pre-order.
    pub fn descendants(&self) -> Vec<&Node> {
        let mut collector = Collector::default();
        collector.visit_list(&self.root);
        collector.nodes
    }

    /// Rewrite the location of every node, the root list included.
    pub fn map_locations(&mut self, f: &mut dyn FnMut(Location) -> Location) {
        map_list(&mut self.root, f);
    }
}

type LocationMap<'f> = dyn FnMut(Location) -> Location + 'f;

fn map_list(list: &mut ListNode, f: &mut LocationMap<'_>) {
    list.location = f(list.location);
    for node in &mut list.nodes {
        map_node(node, f);
    }
}

fn map_pipe(pipe: &mut PipeNode, f: &mut LocationMap<'_>) {
    pipe.location = f(pipe.location);
    for declaration in &mut pipe.declarations {
        declaration.location = f(declaration.location);
    }
    for command in &mut pipe.commands {
        map_command(command, f);
    }
}

fn map_command(command: &mut CommandNode, f: &mut LocationMap<'_>) {
    command.location = f(command.location);
    for argument in &mut command.arguments {
        map_node(argument, f);
    }
}

fn map_branch(branch: &mut BranchNode, f: &mut LocationMap<'_>) {
    branch.location = f(branch.location);
    if let Some(pipe) = &mut branch.pipe {
        map_pipe(pipe, f);
    }
    if let Some(list) = &mut branch.list {
        map_list(list, f);
    }
    if let Some(list) = &mut branch.else_list {
        map_list(list, f);
    }
}

fn map_node(node: &mut Node, f: &mut LocationMap<'_>) {
    match node {
        Node::Action(n) => {
            n.location = f(n.location);
            if let Some(pipe) = &mut n.pipe {
                map_pipe(pipe, f);
            }
        }
        Node::Chain(n) => {
            n.location = f(n.location);
            if let Some(inner) = &mut n.node {
                map_node(inner, f);
            }
        }
        Node::Template(n) => {
            n.location = f(n.location);
            if let Some(pipe) = &mut n.pipe {
                map_pipe(pipe, f);
            }
        }
        Node::Command(n) => map_command(n, f),
        Node::If(n) | Node::Range(n) | Node::With(n) => map_branch(n, f),
        Node::List(n) => map_list(n, f),
        Node::Pipe(n) => map_pipe(n, f),
        Node::Bool(n) => n.location = f(n.location),
        Node::Break(n) => n.location = f(n.location),
        Node::Comment(n) => n.location = f(n.location),
        Node::Continue(n) => n.location = f(n.location),
        Node::Dot(n) => n.location = f(n.location),
        Node::Field(n) => n.location = f(n.location),
        Node::Identifier(n) => n.location = f(n.location),
        Node::Nil(n) => n.location = f(n.location),
        Node::Number(n) => n.location = f(n.location),
        Node::String(n) => n.location = f(n.location),
        Node::Text(n) => n.location = f(n.location),
        Node::Variable(n) => n.location = f(n.location),
    }
}

struct Collector<'a> {
    nodes: Vec<&'a Node>,
    descend: bool,
}

impl Default for Collector<'_> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            descend: true,
        }
    }
}

impl<'a> Visitor<'a> for Collector<'a> {
    fn visit_node(&mut self, node: &'a Node) {
        self.nodes.push(node);
        if self.descend {
            walk_node(self, node);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionNode {
    pub location: Location,
    pub pipe: Option<PipeNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoolNode {
    pub location: Location,
    pub value: bool,
}

/// Body shared by `if`, `range` and `with`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BranchNode {
    pub location: Location,
    pub pipe: Option<PipeNode>,
    pub list: Option<ListNode>,
    pub else_list: Option<ListNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakNode {
    pub location: Location,
}

/// A term followed by field accesses, e.g. `(index .Values "a").b.c`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChainNode {
    pub location: Location,
    pub node: Option<Box<Node>>,
    pub fields: Vec<String>,
}

/// A function call or a single operand, with its arguments in order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandNode {
    pub location: Location,
    pub arguments: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentNode {
    pub location: Location,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContinueNode {
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DotNode {
    pub location: Location,
}

/// Field access path such as `.Values.image.tag`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldNode {
    pub location: Location,
    pub identifiers: Vec<String>,
}

/// Function name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdentifierNode {
    pub location: Location,
    pub identifier: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListNode {
    pub location: Location,
    pub nodes: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NilNode {
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumberNode {
    pub location: Location,
    pub text: String,
}

/// A pipeline with optional variable declarations, e.g. `$x := .a | quote`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipeNode {
    pub location: Location,
    pub declarations: Vec<VariableNode>,
    pub commands: Vec<CommandNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StringNode {
    pub location: Location,
    /// Original text including quotes.
    pub quoted: String,
    pub text: String,
}

/// `{{ template "name" pipeline }}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateNode {
    pub location: Location,
    pub name: String,
    pub pipe: Option<PipeNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextNode {
    pub location: Location,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableNode {
    pub location: Location,
    pub identifiers: Vec<String>,
}

/// A template syntax node.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum Node {
    Action(ActionNode),
    Bool(BoolNode),
    Break(BreakNode),
    Chain(ChainNode),
    Command(CommandNode),
    Comment(CommentNode),
    Continue(ContinueNode),
    Dot(DotNode),
    Field(FieldNode),
    Identifier(IdentifierNode),
    If(BranchNode),
    List(ListNode),
    Nil(NilNode),
    Number(NumberNode),
    Pipe(PipeNode),
    Range(BranchNode),
    String(StringNode),
    Template(TemplateNode),
    Text(TextNode),
    Variable(VariableNode),
    With(BranchNode),
}

impl Node {
    pub fn node_type(&self) -> NodeType {
        match self {
            Node::Action(_) => NodeType::Action,
            Node::Bool(_) => NodeType::Bool,
            Node::Break(_) => NodeType::Break,
            Node::Chain(_) => NodeType::Chain,
            Node::Command(_) => NodeType::Command,
            Node::Comment(_) => NodeType::Comment,
            Node::Continue(_) => NodeType::Continue,
            Node::Dot(_) => NodeType::Dot,
            Node::Field(_) => NodeType::Field,
            Node::Identifier(_) => NodeType::Identifier,
            Node::If(_) => NodeType::If,
            Node::List(_) => NodeType::List,
            Node::Nil(_) => NodeType::Nil,
            Node::Number(_) => NodeType::Number,
            Node::Pipe(_) => NodeType::Pipe,
            Node::Range(_) => NodeType::Range,
            Node::String(_) => NodeType::String,
            Node::Template(_) => NodeType::Template,
            Node::Text(_) => NodeType::Text,
            Node::Variable(_) => NodeType::Variable,
            Node::With(_) => NodeType::With,
        }
    }

    pub fn location(&self) -> Location {
        match self {
            Node::Action(n) => n.location,
            Node::Bool(n) => n.location,
            Node::Break(n) => n.location,
            Node::Chain(n) => n.location,
            Node::Command(n) => n.location,
            Node::Comment(n) => n.location,
            Node::Continue(n) => n.location,
            Node::Dot(n) => n.location,
            Node::Field(n) => n.location,
            Node::Identifier(n) => n.location,
            Node::If(n) | Node::Range(n) | Node::With(n) => n.location,
            Node::List(n) => n.location,
            Node::Nil(n) => n.location,
            Node::Number(n) => n.location,
            Node::Pipe(n) => n.location,
            Node::String(n) => n.location,
            Node::Template(n) => n.location,
            Node::Text(n) => n.location,
            Node::Variable(n) => n.location,
        }
    }

    /// Line/column range of this node within the template `source`.
    pub fn text_range(&self, source: &str) -> Result<TextRange, LocationError> {
        self.location().to_text_range(source)
    }

    /// Nearest nested nodes, looking through pipes, commands and branch bodies.
    pub fn children(&self) -> Vec<&Node> {
        let mut collector = Collector {
            nodes: Vec::new(),
            descend: false,
        };
        walk_node(&mut collector, self);
        collector.nodes
    }

    /// Every nested node in depth-first pre-order, excluding `self`.
    pub fn descendants(&self) -> Vec<&Node> {
        let mut collector = Collector::default();
        walk_node(&mut collector, self);
        collector.nodes
    }

    /// The branch body of an `if`, `range` or `with` node.
    pub fn as_branch(&self) -> Option<&BranchNode> {
        match self {
            Node::If(b) | Node::Range(b) | Node::With(b) => Some(b),
            _ => None,
        }
    }

    /// Identifier path of a field, chain or variable node.
    pub fn identifiers(&self) -> Option<&[String]> {
        match self {
            Node::Field(n) => Some(&n.identifiers),
            Node::Chain(n) => Some(&n.fields),
            Node::Variable(n) => Some(&n.identifiers),
            _ => None,
        }
    }
}

impl CommandNode {
    /// Name of the called function, when the first argument is an identifier.
    pub fn function_name(&self) -> Option<&str> {
        match self.arguments.first() {
            Some(Node::Identifier(id)) => Some(&id.identifier),
            _ => None,
        }
    }
}
