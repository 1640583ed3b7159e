//! Traversal engine behavior: arity routing, barriers, naming, ordering.

mod common;

use bytes::Bytes;
use common::*;

use paperflow::compiler::{BarrierTable, JoinBarrier};
use paperflow::engine::{EngineError, Traversal};
use paperflow::events::{ChannelEmitter, Event, NullEmitter};
use paperflow::model::{FileUnit, Payload};
use paperflow::operations::{OpKind, Operation};

async fn run_graph(
    transformer: &StubTransformer,
    graph: &[Operation],
    input: Payload,
) -> Result<Vec<FileUnit>, EngineError> {
    let mut barriers = BarrierTable::compile(graph).unwrap();
    Traversal::new(transformer, &mut barriers, &NullEmitter)
        .run(graph, input)
        .await
}

#[tokio::test]
async fn empty_graph_returns_input_unchanged() {
    let transformer = StubTransformer::new();
    let input = unit("doc.pdf", "original-bytes");
    let buffer = input.buffer.clone();

    let outputs = run_graph(&transformer, &[], Payload::Unit(input))
        .await
        .unwrap();

    assert_eq!(outputs.len(), 1);
    assert_eq!(outputs[0].file_name, "doc");
    assert_eq!(outputs[0].original_file_name, "doc.pdf");
    assert_eq!(outputs[0].buffer, buffer);
    assert!(transformer.calls().is_empty());
}

#[tokio::test]
async fn empty_graph_returns_batch_unchanged() {
    let transformer = StubTransformer::new();
    let input = vec![unit("a.pdf", "a"), unit("b.pdf", "b")];

    let outputs = run_graph(&transformer, &[], Payload::from_inputs(input))
        .await
        .unwrap();

    let names: Vec<_> = outputs.iter().map(|u| u.file_name.clone()).collect();
    assert_eq!(names, ["a", "b"]);
}

#[tokio::test]
async fn nested_unary_operations_accumulate_suffixes() {
    let transformer = StubTransformer::new();
    let graph = vec![rotate(90, vec![extract(vec![0, 2], vec![])])];

    let outputs = run_graph(&transformer, &graph, Payload::Unit(unit("doc.pdf", "doc")))
        .await
        .unwrap();

    assert_eq!(outputs.len(), 1);
    assert_eq!(outputs[0].download_name(), "doc_turned_extractedPages.pdf");
    assert_eq!(transformer.calls(), ["rotate", "extract"]);
}

#[tokio::test]
async fn rotating_twice_by_90_matches_one_180_rotation() {
    let twice = StubTransformer::new();
    let graph = vec![rotate(90, vec![rotate(90, vec![])])];
    let out_twice = run_graph(&twice, &graph, Payload::Unit(unit("doc.pdf", "doc")))
        .await
        .unwrap();

    let once = StubTransformer::new();
    let graph = vec![rotate(180, vec![])];
    let out_once = run_graph(&once, &graph, Payload::Unit(unit("doc.pdf", "doc")))
        .await
        .unwrap();

    assert_eq!(recorded_angle(&out_twice[0].buffer), 180);
    assert_eq!(
        recorded_angle(&out_twice[0].buffer),
        recorded_angle(&out_once[0].buffer)
    );
}

#[tokio::test]
async fn split_routes_the_whole_fragment_list_downstream() {
    // Five fragments flow to the child as one branch set, not unit by unit.
    let transformer = StubTransformer::new().with_split_fanout(5);
    let graph = vec![split(vec![1, 3], vec![rotate(90, vec![])])];

    let outputs = run_graph(&transformer, &graph, Payload::Unit(unit("doc.pdf", "doc")))
        .await
        .unwrap();

    assert_eq!(outputs.len(), 5);
    let names: Vec<_> = outputs.iter().map(|u| u.file_name.clone()).collect();
    assert_eq!(
        names,
        [
            "doc_split0_turned",
            "doc_split1_turned",
            "doc_split2_turned",
            "doc_split3_turned",
            "doc_split4_turned",
        ]
    );
    // One split call, then one rotate per fragment.
    assert_eq!(
        transformer.calls(),
        ["split", "rotate", "rotate", "rotate", "rotate", "rotate"]
    );
}

#[tokio::test]
async fn split_fragment_counts_are_conserved() {
    let transformer = StubTransformer::new();
    // Two cut points yield three fragments per unit; two units in, six out.
    let graph = vec![split(vec![1, 3], vec![])];
    let input = Payload::from_inputs(vec![unit("a.pdf", "a"), unit("b.pdf", "b")]);

    let outputs = run_graph(&transformer, &graph, input).await.unwrap();

    assert_eq!(outputs.len(), 6);
    assert_eq!(outputs[0].file_name, "a_split0");
    assert_eq!(outputs[3].file_name, "b_split0");
}

#[tokio::test]
async fn fan_out_reconverges_through_barrier_into_merge() {
    let transformer = StubTransformer::new().with_split_fanout(3);
    let graph = vec![split(
        vec![0, 1],
        vec![wait("barrier", vec![merge(vec![])])],
    )];

    let outputs = run_graph(&transformer, &graph, Payload::Unit(unit("doc.pdf", "doc")))
        .await
        .unwrap();

    // The barrier fired exactly once, with the split's full fan-out.
    assert_eq!(transformer.merge_calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert_eq!(transformer.merge_input_sizes.lock().unwrap().as_slice(), [3]);
    assert_eq!(outputs.len(), 1);
    assert_eq!(
        outputs[0].file_name,
        "doc_split0_doc_split1_doc_split2_merged"
    );
}

#[tokio::test]
async fn two_branches_reconverge_exactly_once() {
    let transformer = StubTransformer::new();
    // Sibling branches arrive at the same barrier; the continuation lives
    // on the second wait node.
    let graph = vec![
        rotate(90, vec![wait("w", vec![])]),
        extract(vec![0], vec![wait("w", vec![merge(vec![])])]),
    ];

    let outputs = run_graph(&transformer, &graph, Payload::Unit(unit("doc.pdf", "doc")))
        .await
        .unwrap();

    assert_eq!(transformer.merge_calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert_eq!(transformer.merge_input_sizes.lock().unwrap().as_slice(), [2]);
    assert_eq!(outputs.len(), 1);
    assert_eq!(outputs[0].file_name, "doc_turned_doc_extractedPages_merged");
}

#[tokio::test]
async fn barrier_arrival_after_firing_is_fatal() {
    // Hand-built table that under-counts: three wait nodes, count of two.
    let transformer = StubTransformer::new();
    let graph = vec![
        wait("w", vec![]),
        wait("w", vec![]),
        wait("w", vec![]),
    ];
    let mut barriers = BarrierTable::default();
    barriers.insert(JoinBarrier::with_state("w", 2, vec![]));

    let err = Traversal::new(&transformer, &mut barriers, &NullEmitter)
        .run(&graph, Payload::Unit(unit("doc.pdf", "doc")))
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::BarrierRefire { ref id } if id == "w"));
}

#[tokio::test]
async fn wait_without_continuation_flattens_into_output() {
    let transformer = StubTransformer::new();
    let graph = vec![
        rotate(90, vec![wait("w", vec![])]),
        rotate(180, vec![wait("w", vec![])]),
    ];

    let outputs = run_graph(&transformer, &graph, Payload::Unit(unit("doc.pdf", "doc")))
        .await
        .unwrap();

    assert_eq!(outputs.len(), 2);
}

#[tokio::test]
async fn missing_barrier_is_reported_not_panicked() {
    let transformer = StubTransformer::new();
    let graph = vec![wait("w", vec![])];
    // Deliberately empty table: the engine must fail, not fire blind.
    let mut barriers = BarrierTable::default();

    let err = Traversal::new(&transformer, &mut barriers, &NullEmitter)
        .run(&graph, Payload::Unit(unit("doc.pdf", "doc")))
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::UnknownBarrier { ref id } if id == "w"));
}

#[tokio::test]
async fn merge_flattens_an_already_batched_branch_set() {
    let transformer = StubTransformer::new();
    let graph = vec![merge(vec![])];
    let input = Payload::from_inputs(vec![
        unit("a.pdf", "a"),
        unit("b.pdf", "b"),
        unit("c.pdf", "c"),
    ]);

    let outputs = run_graph(&transformer, &graph, input).await.unwrap();

    assert_eq!(outputs.len(), 1);
    assert_eq!(outputs[0].file_name, "a_b_c_merged");
    assert_eq!(outputs[0].buffer, Bytes::from_static(b"a+b+c"));
    assert_eq!(outputs[0].original_file_name, "a.pdf");
}

#[tokio::test]
async fn merge_coerces_a_single_unit() {
    let transformer = StubTransformer::new();
    let graph = vec![merge(vec![])];

    let outputs = run_graph(&transformer, &graph, Payload::Unit(unit("solo.pdf", "s")))
        .await
        .unwrap();

    assert_eq!(outputs[0].file_name, "solo_merged");
    assert_eq!(transformer.merge_input_sizes.lock().unwrap().as_slice(), [1]);
}

#[tokio::test]
async fn collaborator_failure_aborts_the_whole_run() {
    let transformer = StubTransformer::new().failing_on("extract");
    let graph = vec![rotate(90, vec![extract(vec![0], vec![])])];

    let err = run_graph(&transformer, &graph, Payload::Unit(unit("doc.pdf", "doc")))
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::Transform(_)));
}

#[tokio::test]
async fn progress_events_precede_each_operation_in_order() {
    let transformer = StubTransformer::new();
    let graph = vec![rotate(
        90,
        vec![split(vec![0], vec![merge(vec![])])],
    )];
    let mut barriers = BarrierTable::compile(&graph).unwrap();
    let (emitter, rx) = ChannelEmitter::unbounded();

    Traversal::new(&transformer, &mut barriers, &emitter)
        .run(&graph, Payload::Unit(unit("doc.pdf", "doc")))
        .await
        .unwrap();
    drop(emitter);

    let events: Vec<Event> = rx.drain().collect();
    let messages: Vec<_> = events.iter().map(Event::message).collect();
    assert_eq!(
        messages,
        ["Starting: rotate", "Starting: split", "Starting: merge"]
    );
}

#[tokio::test]
async fn sibling_branches_each_get_their_own_copy() {
    let transformer = StubTransformer::new();
    // Both siblings start from the same input; mutations in one branch must
    // not leak into the other.
    let graph = vec![rotate(90, vec![]), rotate(180, vec![])];

    let outputs = run_graph(&transformer, &graph, Payload::Unit(unit("doc.pdf", "doc")))
        .await
        .unwrap();

    assert_eq!(outputs.len(), 2);
    assert_eq!(recorded_angle(&outputs[0].buffer), 90);
    assert_eq!(recorded_angle(&outputs[1].buffer), 180);
}

#[tokio::test]
async fn all_unary_operations_route_one_to_one() {
    let transformer = StubTransformer::new();
    let graph = vec![Operation::with_children(
        OpKind::Impose {
            nup: 4,
            format: "A4".into(),
        },
        vec![Operation::with_children(
            OpKind::EditMetadata {
                metadata: [("Title".to_string(), "Report".to_string())].into(),
            },
            vec![Operation::with_children(
                OpKind::Organize {
                    operation: "REVERSE_ORDER".into(),
                    custom_order: None,
                },
                vec![Operation::leaf(OpKind::RemoveBlankPages {
                    white_threshold: 10.0,
                })],
            )],
        )],
    )];

    let outputs = run_graph(&transformer, &graph, Payload::Unit(unit("doc.pdf", "doc")))
        .await
        .unwrap();

    assert_eq!(outputs.len(), 1);
    assert_eq!(
        outputs[0].file_name,
        "doc_imposed_editedMetadata_organized_blanksRemoved"
    );
    assert_eq!(
        transformer.calls(),
        ["impose", "editMetadata", "organize", "removeBlankPages"]
    );
}
