//! Depth-first traversal of template syntax trees.
//!
//! Implement only the `visit_*` methods you care about and call the matching
//! `walk_*` function to keep descending.

use super::{BranchNode, CommandNode, ListNode, Node, PipeNode};

pub trait Visitor<'a> {
    fn visit_node(&mut self, node: &'a Node) {
        walk_node(self, node);
    }

    fn visit_list(&mut self, list: &'a ListNode) {
        walk_list(self, list);
    }

    fn visit_pipe(&mut self, pipe: &'a PipeNode) {
        walk_pipe(self, pipe);
    }

    fn visit_command(&mut self, command: &'a CommandNode) {
        walk_command(self, command);
    }

    fn visit_branch(&mut self, branch: &'a BranchNode) {
        walk_branch(self, branch);
    }
}

pub fn walk_node<'a, V: Visitor<'a> + ?Sized>(visitor: &mut V, node: &'a Node) {
    match node {
        Node::Action(action) => {
            if let Some(pipe) = &action.pipe {
                visitor.visit_pipe(pipe);
            }
        }
        Node::Chain(chain) => {
            if let Some(inner) = &chain.node {
                visitor.visit_node(inner);
            }
        }
        Node::Command(command) => visitor.visit_command(command),
        Node::If(branch) | Node::Range(branch) | Node::With(branch) => visitor.visit_branch(branch),
        Node::List(list) => visitor.visit_list(list),
        Node::Pipe(pipe) => visitor.visit_pipe(pipe),
        Node::Template(template) => {
            if let Some(pipe) = &template.pipe {
                visitor.visit_pipe(pipe);
            }
        }
        Node::Bool(_)
        | Node::Break(_)
        | Node::Comment(_)
        | Node::Continue(_)
        | Node::Dot(_)
        | Node::Field(_)
        | Node::Identifier(_)
        | Node::Nil(_)
        | Node::Number(_)
        | Node::String(_)
        | Node::Text(_)
        | Node::Variable(_) => {}
    }
}

pub fn walk_list<'a, V: Visitor<'a> + ?Sized>(visitor: &mut V, list: &'a ListNode) {
    for node in &list.nodes {
        visitor.visit_node(node);
    }
}

pub fn walk_pipe<'a, V: Visitor<'a> + ?Sized>(visitor: &mut V, pipe: &'a PipeNode) {
    for command in &pipe.commands {
        visitor.visit_command(command);
    }
}

pub fn walk_command<'a, V: Visitor<'a> + ?Sized>(visitor: &mut V, command: &'a CommandNode) {
    for argument in &command.arguments {
        visitor.visit_node(argument);
    }
}

pub fn walk_branch<'a, V: Visitor<'a> + ?Sized>(visitor: &mut V, branch: &'a BranchNode) {
    if let Some(pipe) = &branch.pipe {
        visitor.visit_pipe(pipe);
    }
    if let Some(list) = &branch.list {
        visitor.visit_list(list);
    }
    if let Some(list) = &branch.else_list {
        visitor.visit_list(list);
    }
}
