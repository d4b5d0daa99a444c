#![no_main]

use libfuzzer_sys::fuzz_target;
use wirebox::DependencyGraph;

// Byte pairs are edges between up to 16 nodes. Topological order must list
// every node once and, for acyclic inputs, put dependencies first.
fuzz_target!(|data: &[u8]| {
    let mut graph = DependencyGraph::new();
    for pair in data.chunks_exact(2).take(64) {
        let from = format!("n{}", pair[0] % 16);
        let to = format!("n{}", pair[1] % 16);
        graph.add_edge(from.as_str(), to.as_str());
    }

    let order = graph.topological_order();
    assert_eq!(order.len(), graph.len());

    let teardown = graph.invert().topological_order();
    assert_eq!(teardown.len(), graph.len());

    // A cycle exists iff some edge points back at a key its target reaches.
    let acyclic = graph
        .edges()
        .all(|(from, to)| !graph.transitive_dependencies(to).contains(from));
    if acyclic {
        let position = |key: &wirebox::ServiceKey| order.iter().position(|k| k == key);
        for (from, to) in graph.edges() {
            assert!(position(to) < position(from));
        }
    }
});
