//! Decoding of `Any`-packed wire nodes into typed [`Node`]s.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use prost::Message;
use prost_types::Any;

use super::wire;
use super::{
    ActionNode, BoolNode, BranchNode, BreakNode, ChainNode, CommandNode, CommentNode, ContinueNode,
    DotNode, FieldNode, IdentifierNode, ListNode, NilNode, Node, NumberNode, PipeNode, StringNode,
    TemplateNode, TextNode, Tree, VariableNode,
};
use crate::helm::location::Location;

type Decoder = fn(&[u8]) -> Result<Node, prost::DecodeError>;

/// Node decoders keyed by simple message name; the package varies between
/// evaluator builds.
static REGISTRY: Lazy<HashMap<&'static str, Decoder>> = Lazy::new(|| {
    let decoders: [(&str, Decoder); 21] = [
        ("ActionNode", |b| Ok(Node::Action(action(wire::ActionNode::decode(b)?)))),
        ("BoolNode", |b| Ok(Node::Bool(boolean(wire::BoolNode::decode(b)?)))),
        ("BreakNode", |b| {
            let m = wire::BreakNode::decode(b)?;
            Ok(Node::Break(BreakNode {
                location: Location::from_wire(m.pos, m.length),
            }))
        }),
        ("ChainNode", |b| Ok(Node::Chain(chain(wire::ChainNode::decode(b)?)))),
        ("CommandNode", |b| Ok(Node::Command(command(wire::CommandNode::decode(b)?)))),
        ("CommentNode", |b| {
            let m = wire::CommentNode::decode(b)?;
            Ok(Node::Comment(CommentNode {
                location: Location::from_wire(m.pos, m.length),
                text: m.text,
            }))
        }),
        ("ContinueNode", |b| {
            let m = wire::ContinueNode::decode(b)?;
            Ok(Node::Continue(ContinueNode {
                location: Location::from_wire(m.pos, m.length),
            }))
        }),
        ("DotNode", |b| {
            let m = wire::DotNode::decode(b)?;
            Ok(Node::Dot(DotNode {
                location: Location::from_wire(m.pos, m.length),
            }))
        }),
        ("FieldNode", |b| {
            let m = wire::FieldNode::decode(b)?;
            Ok(Node::Field(FieldNode {
                location: Location::from_wire(m.pos, m.length),
                identifiers: m.ident,
            }))
        }),
        ("IdentifierNode", |b| {
            let m = wire::IdentifierNode::decode(b)?;
            Ok(Node::Identifier(IdentifierNode {
                location: Location::from_wire(m.pos, m.length),
                identifier: m.ident,
            }))
        }),
        ("IfNode", |b| {
            let m = wire::IfNode::decode(b)?;
            Ok(Node::If(branch(m.pos, m.length, m.branch_node)))
        }),
        ("ListNode", |b| Ok(Node::List(list(wire::ListNode::decode(b)?)))),
        ("NilNode", |b| {
            let m = wire::NilNode::decode(b)?;
            Ok(Node::Nil(NilNode {
                location: Location::from_wire(m.pos, m.length),
            }))
        }),
        ("NumberNode", |b| {
            let m = wire::NumberNode::decode(b)?;
            Ok(Node::Number(NumberNode {
                location: Location::from_wire(m.pos, m.length),
                text: m.text,
            }))
        }),
        ("PipeNode", |b| Ok(Node::Pipe(pipe(wire::PipeNode::decode(b)?)))),
        ("RangeNode", |b| {
            let m = wire::RangeNode::decode(b)?;
            Ok(Node::Range(branch(m.pos, m.length, m.branch_node)))
        }),
        ("StringNode", |b| {
            let m = wire::StringNode::decode(b)?;
            Ok(Node::String(StringNode {
                location: Location::from_wire(m.pos, m.length),
                quoted: m.quoted,
                text: m.text,
            }))
        }),
        ("TemplateNode", |b| {
            let m = wire::TemplateNode::decode(b)?;
            Ok(Node::Template(TemplateNode {
                location: Location::from_wire(m.pos, m.length),
                name: m.name,
                pipe: m.pipe.map(pipe),
            }))
        }),
        ("TextNode", |b| {
            let m = wire::TextNode::decode(b)?;
            Ok(Node::Text(TextNode {
                location: Location::from_wire(m.pos, m.length),
                text: String::from_utf8_lossy(&m.text).into_owned(),
            }))
        }),
        ("VariableNode", |b| Ok(Node::Variable(variable(wire::VariableNode::decode(b)?)))),
        ("WithNode", |b| {
            let m = wire::WithNode::decode(b)?;
            Ok(Node::With(branch(m.pos, m.length, m.branch_node)))
        }),
    ];

    decoders.into_iter().collect()
});

/// Decode one packed node.
///
/// Returns `None` for type names outside the registry and for payloads that
/// fail to decode, so a single bad node never takes its siblings down.
pub fn unpack_node(any: &Any) -> Option<Node> {
    let type_name = any.type_url.rsplit(['/', '.']).next().unwrap_or_default();
    let Some(decoder) = REGISTRY.get(type_name) else {
        log::debug!("Unknown node type: {}", any.type_url);
        return None;
    };
    match decoder(&any.value) {
        Ok(node) => Some(node),
        Err(e) => {
            log::debug!("Failed to decode node of type {}: {}", type_name, e);
            None
        }
    }
}

/// Decode a sequence of packed nodes, skipping the ones that cannot be decoded.
pub fn unpack(nodes: &[Any]) -> Vec<Node> {
    nodes.iter().filter_map(unpack_node).collect()
}

fn action(m: wire::ActionNode) -> ActionNode {
    ActionNode {
        location: Location::from_wire(m.pos, m.length),
        pipe: m.pipe.map(pipe),
    }
}

fn boolean(m: wire::BoolNode) -> BoolNode {
    BoolNode {
        location: Location::from_wire(m.pos, m.length),
        value: m.value,
    }
}

fn chain(m: wire::ChainNode) -> ChainNode {
    ChainNode {
        location: Location::from_wire(m.pos, m.length),
        node: m.node.as_ref().and_then(unpack_node).map(Box::new),
        fields: m.field,
    }
}

fn command(m: wire::CommandNode) -> CommandNode {
    CommandNode {
        location: Location::from_wire(m.pos, m.length),
        arguments: unpack(&m.args),
    }
}

fn list(m: wire::ListNode) -> ListNode {
    ListNode {
        location: Location::from_wire(m.pos, m.length),
        nodes: unpack(&m.nodes),
    }
}

fn pipe(m: wire::PipeNode) -> PipeNode {
    PipeNode {
        location: Location::from_wire(m.pos, m.length),
        declarations: m.decl.into_iter().map(variable).collect(),
        commands: m.cmds.into_iter().map(command).collect(),
    }
}

fn variable(m: wire::VariableNode) -> VariableNode {
    VariableNode {
        location: Location::from_wire(m.pos, m.length),
        identifiers: m.ident,
    }
}

/// `if`/`range`/`with` carry their own position; the body comes from the branch.
fn branch(pos: i64, length: i64, body: Option<wire::BranchNode>) -> BranchNode {
    let location = Location::from_wire(pos, length);
    match body {
        Some(b) => BranchNode {
            location,
            pipe: b.pipe.map(pipe),
            list: b.list.map(list),
            else_list: b.else_list.map(list),
        },
        None => BranchNode {
            location,
            pipe: None,
            list: None,
            else_list: None,
        },
    }
}

impl Tree {
    /// Build a tree from its wire form. A missing tree, or one without a
    /// root list, yields `None`.
    pub fn from_wire(tree: Option<wire::Tree>) -> Option<Self> {
        let tree = tree?;
        let root = list(tree.root?);
        Some(Self {
            name: tree.name,
            parse_name: tree.parse_name,
            mode: tree.mode,
            root,
        })
    }
}
