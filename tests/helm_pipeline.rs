use helm_iac::error::EvaluationError;
use helm_iac::helm::ast::wire::{self, NodeType, TemplateEvaluationResult};
use helm_iac::helm::evaluator::{HelmEvaluator, ProcessOutput, ProcessRunner};
use helm_iac::helm::{HelmProcessor, Location, Node, TextRange, add_line_comments};
use parking_lot::Mutex;
use prost::Message;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Stands in for the evaluator executable: answers every request with a
/// fixed rendering and keeps the last request it received.
struct ScriptedEvaluator {
    response: TemplateEvaluationResult,
    last_input: Arc<Mutex<Vec<u8>>>,
}

impl ProcessRunner for ScriptedEvaluator {
    fn name(&self) -> &str {
        "scripted-evaluator"
    }

    fn run(&self, input: &[u8]) -> Result<ProcessOutput, EvaluationError> {
        *self.last_input.lock() = input.to_vec();
        Ok(ProcessOutput {
            stdout: self.response.encode_to_vec(),
            exit_code: Some(0),
        })
    }
}

fn processor(response: TemplateEvaluationResult) -> (HelmProcessor, Arc<Mutex<Vec<u8>>>) {
    let last_input = Arc::new(Mutex::new(Vec::new()));
    let runner = ScriptedEvaluator {
        response,
        last_input: Arc::clone(&last_input),
    };
    (HelmProcessor::new(Arc::new(HelmEvaluator::new(runner))), last_input)
}

fn rendered(template: &str, ast: Option<wire::Tree>) -> TemplateEvaluationResult {
    TemplateEvaluationResult {
        template: template.to_string(),
        ast,
        error: String::new(),
    }
}

fn values(content: &str) -> BTreeMap<String, String> {
    BTreeMap::from([("values.yaml".to_string(), content.to_string())])
}

/// Parse tree the engine returns for `{{ .Values.header }}`.
fn header_tree() -> wire::Tree {
    let field = wire::FieldNode {
        node_type: NodeType::Field as i32,
        pos: 3,
        length: 14,
        ident: vec!["Values".to_string(), "header".to_string()],
    };
    let command = wire::CommandNode {
        node_type: NodeType::Command as i32,
        pos: 3,
        length: 14,
        args: vec![wire::pack("FieldNode", &field)],
    };
    let pipe = wire::PipeNode {
        node_type: NodeType::Pipe as i32,
        pos: 3,
        length: 14,
        decl: Vec::new(),
        cmds: vec![command],
    };
    let action = wire::ActionNode {
        node_type: NodeType::Action as i32,
        pos: 0,
        length: 20,
        pipe: Some(pipe),
    };
    wire::Tree {
        name: "chart/templates/header.yaml".to_string(),
        parse_name: "chart/templates/header.yaml".to_string(),
        mode: 0,
        root: Some(wire::ListNode {
            node_type: NodeType::List as i32,
            pos: 0,
            // `{{ .Values.header }} #1`
            length: 23,
            nodes: vec![wire::pack("ActionNode", &action)],
        }),
    }
}

#[test]
fn test_field_reference_in_parse_tree() {
    let (processor, _) = processor(rendered("v1 #1", Some(header_tree())));
    let processed = processor
        .process("chart/templates/header.yaml", "{{ .Values.header }}", &values("header: v1"))
        .unwrap();

    assert_eq!(processed.source, "v1");
    let tree = processed.ast.expect("parse tree");
    assert_eq!(tree.root.location, Location::new(0, 20));
    assert_eq!(tree.root.nodes.len(), 1);

    let Node::Action(action) = &tree.root.nodes[0] else {
        panic!("expected an action, got {:?}", tree.root.nodes[0]);
    };
    let pipe = action.pipe.as_ref().expect("pipe");
    let argument = &pipe.commands[0].arguments[0];
    assert_eq!(argument.node_type(), NodeType::Field);
    assert_eq!(
        argument.identifiers(),
        Some(&["Values".to_string(), "header".to_string()][..])
    );
}

#[test]
fn test_node_location_maps_to_template_text() {
    let source = "kind: ConfigMap\ndata:\n  header: {{ .Values.header }}";
    // the engine parses the annotated text, so its offsets count the markers
    let annotated = add_line_comments(source);
    let field_pos = annotated.find(".Values.header").unwrap();
    assert_eq!(field_pos, 41);

    let field = wire::FieldNode {
        node_type: NodeType::Field as i32,
        pos: field_pos as i64,
        length: 14,
        ident: vec!["Values".to_string(), "header".to_string()],
    };
    let tree = wire::Tree {
        name: "cm.yaml".to_string(),
        parse_name: "cm.yaml".to_string(),
        mode: 0,
        root: Some(wire::ListNode {
            node_type: NodeType::List as i32,
            pos: 0,
            length: annotated.len() as i64,
            nodes: vec![wire::pack("FieldNode", &field)],
        }),
    };
    let (processor, input) = processor(rendered(
        "kind: ConfigMap #1\ndata: #2\n  header: v1 #3",
        Some(tree),
    ));
    let processed = processor.process("cm.yaml", source, &values("header: v1")).unwrap();
    assert!(String::from_utf8_lossy(&input.lock()).contains(&annotated));

    let ast = processed.ast.unwrap();
    assert_eq!(ast.root.location, Location::new(0, source.len()));
    let field = &ast.root.nodes[0];
    assert_eq!(field.location(), Location::new(35, 14));
    assert_eq!(field.text_range(source).unwrap(), TextRange::of(3, 13, 3, 27));
}

#[test]
fn test_deleted_lines_are_not_reported() {
    let source = "a: 1\n{{- if .Values.enabled }}\nb: 2\n{{- end }}\nc: 3";
    // engine output with the conditional off: the `if`/`end` markers trail
    // the preceding lines, the body is gone
    let (processor, input) = processor(rendered("a: 1 #1 #2 #4\nc: 3 #5", None));
    let processed = processor.process("x.yaml", source, &values("enabled: false")).unwrap();

    assert_eq!(processed.source, "a: 1\nc: 3");
    let shifts: Vec<_> = processed
        .shift_table
        .entries()
        .map(|e| (e.shifted_line, e.original_start, e.original_end))
        .collect();
    assert_eq!(shifts, vec![(1, 1, 1), (2, 5, 5)]);

    let documents = processed.parse_documents().unwrap();
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0]["c"], serde_yaml::Value::from(3));

    let sent = String::from_utf8_lossy(&input.lock()).to_string();
    assert!(sent.contains("a: 1 #1\n{{- if .Values.enabled }} #2\nb: 2 #3\n{{- end }} #4\nc: 3 #5"));
}

#[test]
fn test_yaml_error_points_at_template_line() {
    let source = "a: 1\n{{- if true }}\nb: c: {{ .Values.c }}\n{{- end }}";
    let (processor, _) = processor(rendered("a: 1 #1 #2\nb: c: d #3 #4", None));
    let processed = processor.process("x.yaml", source, &values("c: d")).unwrap();

    let err = processed.parse_documents().unwrap_err();
    let mark = err.reported().problem_mark.expect("problem mark");
    assert_eq!((mark.line, mark.column), (2, 0));
}

#[test]
fn test_engine_error_is_skipped() {
    let (processor, _) = processor(TemplateEvaluationResult {
        template: String::new(),
        ast: None,
        error: "template: x.yaml:1: function \"nope\" not defined".to_string(),
    });
    assert!(processor.process_or_skip("x.yaml", "{{ nope }}", &values("a: 1")).is_none());
}
