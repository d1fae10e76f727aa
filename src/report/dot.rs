use std::fmt::Write;
use std::path::Path;

use super::write_file;
use crate::error::ReportError;
use crate::snapshot::ClusterSnapshot;

const MAX_LABEL_CHARS: usize = 30;

/// Graphviz node id: everything but ASCII alphanumerics becomes `_`.
fn node_id(prefix: &str, name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("{}_{}", prefix, sanitized)
}

fn label(name: &str) -> String {
    let shortened = if name.chars().count() > MAX_LABEL_CHARS {
        let head: String = name.chars().take(MAX_LABEL_CHARS - 3).collect();
        format!("{}...", head)
    } else {
        name.to_string()
    };
    shortened.replace('\\', "\\\\").replace('"', "\\\"")
}

pub fn render_dot(snapshot: &ClusterSnapshot) -> String {
    let mut dot = String::new();
    // Writing into a String cannot fail.
    let _ = write_graph(&mut dot, snapshot);
    dot
}

pub fn save_dot(snapshot: &ClusterSnapshot, path: &Path) -> Result<(), ReportError> {
    write_file(path, &render_dot(snapshot))
}

fn write_graph(out: &mut String, snapshot: &ClusterSnapshot) -> std::fmt::Result {
    writeln!(out, "digraph KafkaCluster {{")?;
    writeln!(out, "  rankdir=LR;")?;
    writeln!(out, "  node [shape=box, style=rounded];")?;
    writeln!(out, "  graph [splines=true, overlap=false];")?;
    writeln!(out)?;

    writeln!(out, "  subgraph cluster_topics {{")?;
    writeln!(out, "    label=\"Topics\";")?;
    writeln!(out, "    style=filled;")?;
    writeln!(out, "    color=lightgrey;")?;
    writeln!(out, "    node [style=filled, fillcolor=\"#667eea\", fontcolor=white];")?;
    for topic in &snapshot.topics {
        writeln!(
            out,
            "    {} [label=\"{}\\n({} partitions)\"];",
            node_id("topic", &topic.name),
            label(&topic.name),
            topic.partitions
        )?;
    }
    writeln!(out, "  }}")?;
    writeln!(out)?;

    writeln!(out, "  subgraph cluster_consumers {{")?;
    writeln!(out, "    label=\"Consumer Groups\";")?;
    writeln!(out, "    style=filled;")?;
    writeln!(out, "    color=lightblue;")?;
    writeln!(out, "    node [style=filled, fillcolor=\"#43e97b\", fontcolor=white];")?;
    for group in &snapshot.consumer_groups {
        writeln!(
            out,
            "    {} [label=\"{}\\n({} members, {})\"];",
            node_id("consumer", &group.name),
            label(&group.name),
            group.members,
            label(&group.state)
        )?;
    }
    writeln!(out, "  }}")?;
    writeln!(out)?;

    for group in &snapshot.consumer_groups {
        for topic in &group.topics {
            writeln!(
                out,
                "  {} -> {} [color=\"#667eea\", penwidth=2.0];",
                node_id("topic", topic),
                node_id("consumer", &group.name)
            )?;
        }
    }

    writeln!(out, "}}")
}
