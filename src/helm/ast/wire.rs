//! Protobuf messages exchanged with the template evaluator.
//!
//! Child nodes of heterogeneous kind travel as `google.protobuf.Any`, tagged
//! with the message name of the concrete node type.

use prost_types::Any;

/// Package used when packing node messages. Decoding only looks at the
/// message name, so any package is accepted.
pub const PACKAGE: &str = "helm.template";

/// Kind of a template node. Mirrors the engine's node kinds shifted by one so
/// that zero means unknown.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum NodeType {
    Unknown = 0,
    Text = 1,
    Action = 2,
    Bool = 3,
    Chain = 4,
    Command = 5,
    Dot = 6,
    Else = 7,
    End = 8,
    Field = 9,
    Identifier = 10,
    If = 11,
    List = 12,
    Nil = 13,
    Number = 14,
    Pipe = 15,
    Range = 16,
    String = 17,
    Template = 18,
    Variable = 19,
    With = 20,
    Comment = 21,
    Break = 22,
    Continue = 23,
}

/// Response written by the evaluator on stdout.
#[derive(Clone, PartialEq, prost::Message)]
pub struct TemplateEvaluationResult {
    #[prost(string, tag = "1")]
    pub template: String,
    #[prost(message, optional, tag = "2")]
    pub ast: Option<Tree>,
    #[prost(string, tag = "3")]
    pub error: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Tree {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub parse_name: String,
    #[prost(uint64, tag = "3")]
    pub mode: u64,
    #[prost(message, optional, tag = "4")]
    pub root: Option<ListNode>,
}

/// Fallback for node kinds without a dedicated message.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Node {
    #[prost(enumeration = "NodeType", tag = "1")]
    pub node_type: i32,
    #[prost(int64, tag = "2")]
    pub pos: i64,
    #[prost(int64, tag = "3")]
    pub length: i64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ActionNode {
    #[prost(enumeration = "NodeType", tag = "1")]
    pub node_type: i32,
    #[prost(int64, tag = "2")]
    pub pos: i64,
    #[prost(int64, tag = "3")]
    pub length: i64,
    #[prost(message, optional, tag = "4")]
    pub pipe: Option<PipeNode>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct BoolNode {
    #[prost(enumeration = "NodeType", tag = "1")]
    pub node_type: i32,
    #[prost(int64, tag = "2")]
    pub pos: i64,
    #[prost(int64, tag = "3")]
    pub length: i64,
    #[prost(bool, tag = "4")]
    pub value: bool,
}

/// Shared body of `if`, `range` and `with`.
#[derive(Clone, PartialEq, prost::Message)]
pub struct BranchNode {
    #[prost(int64, tag = "2")]
    pub pos: i64,
    #[prost(int64, tag = "3")]
    pub length: i64,
    #[prost(message, optional, tag = "4")]
    pub pipe: Option<PipeNode>,
    #[prost(message, optional, tag = "5")]
    pub list: Option<ListNode>,
    #[prost(message, optional, tag = "6")]
    pub else_list: Option<ListNode>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct BreakNode {
    #[prost(enumeration = "NodeType", tag = "1")]
    pub node_type: i32,
    #[prost(int64, tag = "2")]
    pub pos: i64,
    #[prost(int64, tag = "3")]
    pub length: i64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ChainNode {
    #[prost(enumeration = "NodeType", tag = "1")]
    pub node_type: i32,
    #[prost(int64, tag = "2")]
    pub pos: i64,
    #[prost(int64, tag = "3")]
    pub length: i64,
    #[prost(message, optional, tag = "4")]
    pub node: Option<Any>,
    #[prost(string, repeated, tag = "5")]
    pub field: Vec<String>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CommandNode {
    #[prost(enumeration = "NodeType", tag = "1")]
    pub node_type: i32,
    #[prost(int64, tag = "2")]
    pub pos: i64,
    #[prost(int64, tag = "3")]
    pub length: i64,
    #[prost(message, repeated, tag = "4")]
    pub args: Vec<Any>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CommentNode {
    #[prost(enumeration = "NodeType", tag = "1")]
    pub node_type: i32,
    #[prost(int64, tag = "2")]
    pub pos: i64,
    #[prost(int64, tag = "3")]
    pub length: i64,
    #[prost(string, tag = "4")]
    pub text: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ContinueNode {
    #[prost(enumeration = "NodeType", tag = "1")]
    pub node_type: i32,
    #[prost(int64, tag = "2")]
    pub pos: i64,
    #[prost(int64, tag = "3")]
    pub length: i64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct DotNode {
    #[prost(enumeration = "NodeType", tag = "1")]
    pub node_type: i32,
    #[prost(int64, tag = "2")]
    pub pos: i64,
    #[prost(int64, tag = "3")]
    pub length: i64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct FieldNode {
    #[prost(enumeration = "NodeType", tag = "1")]
    pub node_type: i32,
    #[prost(int64, tag = "2")]
    pub pos: i64,
    #[prost(int64, tag = "3")]
    pub length: i64,
    #[prost(string, repeated, tag = "4")]
    pub ident: Vec<String>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct IdentifierNode {
    #[prost(enumeration = "NodeType", tag = "1")]
    pub node_type: i32,
    #[prost(int64, tag = "2")]
    pub pos: i64,
    #[prost(int64, tag = "3")]
    pub length: i64,
    #[prost(string, tag = "4")]
    pub ident: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct IfNode {
    #[prost(enumeration = "NodeType", tag = "1")]
    pub node_type: i32,
    #[prost(int64, tag = "2")]
    pub pos: i64,
    #[prost(int64, tag = "3")]
    pub length: i64,
    #[prost(message, optional, tag = "4")]
    pub branch_node: Option<BranchNode>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ListNode {
    #[prost(enumeration = "NodeType", tag = "1")]
    pub node_type: i32,
    #[prost(int64, tag = "2")]
    pub pos: i64,
    #[prost(int64, tag = "3")]
    pub length: i64,
    #[prost(message, repeated, tag = "4")]
    pub nodes: Vec<Any>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct NilNode {
    #[prost(enumeration = "NodeType", tag = "1")]
    pub node_type: i32,
    #[prost(int64, tag = "2")]
    pub pos: i64,
    #[prost(int64, tag = "3")]
    pub length: i64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct NumberNode {
    #[prost(enumeration = "NodeType", tag = "1")]
    pub node_type: i32,
    #[prost(int64, tag = "2")]
    pub pos: i64,
    #[prost(int64, tag = "3")]
    pub length: i64,
    #[prost(string, tag = "4")]
    pub text: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct PipeNode {
    #[prost(enumeration = "NodeType", tag = "1")]
    pub node_type: i32,
    #[prost(int64, tag = "2")]
    pub pos: i64,
    #[prost(int64, tag = "3")]
    pub length: i64,
    #[prost(message, repeated, tag = "4")]
    pub decl: Vec<VariableNode>,
    #[prost(message, repeated, tag = "5")]
    pub cmds: Vec<CommandNode>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct RangeNode {
    #[prost(enumeration = "NodeType", tag = "1")]
    pub node_type: i32,
    #[prost(int64, tag = "2")]
    pub pos: i64,
    #[prost(int64, tag = "3")]
    pub length: i64,
    #[prost(message, optional, tag = "4")]
    pub branch_node: Option<BranchNode>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct StringNode {
    #[prost(enumeration = "NodeType", tag = "1")]
    pub node_type: i32,
    #[prost(int64, tag = "2")]
    pub pos: i64,
    #[prost(int64, tag = "3")]
    pub length: i64,
    #[prost(string, tag = "4")]
    pub quoted: String,
    #[prost(string, tag = "5")]
    pub text: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct TemplateNode {
    #[prost(enumeration = "NodeType", tag = "1")]
    pub node_type: i32,
    #[prost(int64, tag = "2")]
    pub pos: i64,
    #[prost(int64, tag = "3")]
    pub length: i64,
    #[prost(string, tag = "4")]
    pub name: String,
    #[prost(message, optional, tag = "5")]
    pub pipe: Option<PipeNode>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct TextNode {
    #[prost(enumeration = "NodeType", tag = "1")]
    pub node_type: i32,
    #[prost(int64, tag = "2")]
    pub pos: i64,
    #[prost(int64, tag = "3")]
    pub length: i64,
    #[prost(bytes = "vec", tag = "4")]
    pub text: Vec<u8>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct VariableNode {
    #[prost(enumeration = "NodeType", tag = "1")]
    pub node_type: i32,
    #[prost(int64, tag = "2")]
    pub pos: i64,
    #[prost(int64, tag = "3")]
    pub length: i64,
    #[prost(string, repeated, tag = "4")]
    pub ident: Vec<String>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct WithNode {
    #[prost(enumeration = "NodeType", tag = "1")]
    pub node_type: i32,
    #[prost(int64, tag = "2")]
    pub pos: i64,
    #[prost(int64, tag = "3")]
    pub length: i64,
    #[prost(message, optional, tag = "4")]
    pub branch_node: Option<BranchNode>,
}

/// Type URL of a node message, e.g. `type.googleapis.com/helm.template.ActionNode`.
pub fn type_url(message: &str) -> String {
    format!("type.googleapis.com/{PACKAGE}.{message}")
}

/// Pack `message` as an `Any` tagged with `type_url(name)`.
pub fn pack<M: prost::Message>(name: &str, message: &M) -> Any {
    Any {
        type_url: type_url(name),
        value: message.encode_to_vec(),
    }
}
