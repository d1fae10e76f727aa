use std::fmt::Write;
use std::path::Path;

use super::{config_pairs, html_escape, write_file};
use crate::error::ReportError;
use crate::formatting::format_number;
use crate::snapshot::ClusterSnapshot;

const STABLE_STATE: &str = "Stable";

const STYLE: &str = r#"        * { margin: 0; padding: 0; box-sizing: border-box; }
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            background: linear-gradient(135deg, #667eea 0%, #764ba2 100%);
            min-height: 100vh;
            padding: 20px;
        }
        .container {
            max-width: 1400px;
            margin: 0 auto;
            background: white;
            border-radius: 12px;
            box-shadow: 0 20px 60px rgba(0,0,0,0.3);
            overflow: hidden;
        }
        .header {
            background: linear-gradient(135deg, #667eea 0%, #764ba2 100%);
            color: white;
            padding: 40px;
            text-align: center;
        }
        .header h1 { font-size: 2.5em; margin-bottom: 10px; }
        .header p { font-size: 1.1em; opacity: 0.9; }
        .stats {
            display: grid;
            grid-template-columns: repeat(auto-fit, minmax(250px, 1fr));
            gap: 20px;
            padding: 40px;
            background: #f8f9fa;
        }
        .stat-card {
            background: white;
            padding: 25px;
            border-radius: 8px;
            box-shadow: 0 2px 8px rgba(0,0,0,0.1);
            text-align: center;
        }
        .stat-card.alert { border: 2px solid #f44336; }
        .stat-number { font-size: 3em; font-weight: bold; color: #667eea; margin-bottom: 10px; }
        .stat-card.alert .stat-number { color: #f44336; }
        .stat-label { color: #666; font-size: 1.1em; }
        .content { padding: 40px; }
        .section { margin-bottom: 40px; }
        .section-title {
            font-size: 1.8em;
            color: #333;
            margin-bottom: 20px;
            padding-bottom: 10px;
            border-bottom: 3px solid #667eea;
        }
        table { width: 100%; border-collapse: collapse; }
        th { background: #667eea; color: white; padding: 15px; text-align: left; }
        td { padding: 12px 15px; border-bottom: 1px solid #eee; }
        tr:hover { background: #f8f9fa; }
        .name { font-weight: 600; color: #667eea; }
        .badge {
            display: inline-block;
            padding: 4px 12px;
            border-radius: 12px;
            font-size: 0.85em;
            font-weight: 600;
        }
        .badge-success { background: #d4edda; color: #155724; }
        .badge-info { background: #d1ecf1; color: #0c5460; }
        .badge-warning { background: #fff3cd; color: #856404; }
        .details { font-size: 0.9em; color: #666; }
"#;

pub fn render_html(snapshot: &ClusterSnapshot) -> String {
    let mut html = String::new();

    // Writing into a String cannot fail.
    let _ = write_document(&mut html, snapshot);
    html
}

pub fn save_html(snapshot: &ClusterSnapshot, path: &Path) -> Result<(), ReportError> {
    write_file(path, &render_html(snapshot))
}

fn write_document(out: &mut String, snapshot: &ClusterSnapshot) -> std::fmt::Result {
    writeln!(out, "<!DOCTYPE html>")?;
    writeln!(out, "<html>\n<head>")?;
    writeln!(out, "    <meta charset=\"UTF-8\">")?;
    writeln!(out, "    <title>Kafka Cluster Report</title>")?;
    writeln!(out, "    <style>\n{}    </style>", STYLE)?;
    writeln!(out, "</head>\n<body>\n    <div class=\"container\">")?;

    writeln!(out, "        <div class=\"header\">")?;
    writeln!(out, "            <h1>Kafka Cluster Analysis</h1>")?;
    writeln!(
        out,
        "            <p>Generated {} from {}</p>",
        html_escape(&snapshot.timestamp),
        html_escape(&snapshot.broker_addresses.join(", "))
    )?;
    writeln!(out, "        </div>")?;

    write_stats(out, snapshot)?;

    writeln!(out, "        <div class=\"content\">")?;
    write_brokers(out, snapshot)?;
    write_topics(out, snapshot)?;
    write_consumer_groups(out, snapshot)?;
    writeln!(out, "        </div>")?;

    writeln!(out, "    </div>\n</body>\n</html>")
}

fn write_stat_card(out: &mut String, value: &str, label: &str, alert: bool) -> std::fmt::Result {
    let class = if alert { "stat-card alert" } else { "stat-card" };
    writeln!(out, "            <div class=\"{}\">", class)?;
    writeln!(out, "                <div class=\"stat-number\">{}</div>", value)?;
    writeln!(out, "                <div class=\"stat-label\">{}</div>", label)?;
    writeln!(out, "            </div>")
}

fn write_stats(out: &mut String, snapshot: &ClusterSnapshot) -> std::fmt::Result {
    writeln!(out, "        <div class=\"stats\">")?;
    write_stat_card(out, &snapshot.brokers.len().to_string(), "Brokers", false)?;
    write_stat_card(out, &snapshot.total_topics.to_string(), "Topics", false)?;
    write_stat_card(out, &snapshot.total_partitions.to_string(), "Total Partitions", false)?;
    write_stat_card(
        out,
        &snapshot.total_consumer_groups.to_string(),
        "Consumer Groups",
        false,
    )?;
    write_stat_card(
        out,
        &html_escape(&format_number(snapshot.total_messages)),
        "Total Messages",
        false,
    )?;
    if snapshot.total_under_replicated_partitions > 0 {
        write_stat_card(
            out,
            &snapshot.total_under_replicated_partitions.to_string(),
            "Under-Replicated",
            true,
        )?;
    }
    writeln!(out, "        </div>")
}

fn write_table_start(out: &mut String, title: &str, headers: &[&str]) -> std::fmt::Result {
    writeln!(out, "            <div class=\"section\">")?;
    writeln!(out, "                <h2 class=\"section-title\">{}</h2>", title)?;
    writeln!(out, "                <table>\n                    <thead>\n                        <tr>")?;
    for header in headers {
        writeln!(out, "                            <th>{}</th>", header)?;
    }
    writeln!(out, "                        </tr>\n                    </thead>\n                    <tbody>")
}

fn write_table_end(out: &mut String) -> std::fmt::Result {
    writeln!(out, "                    </tbody>\n                </table>\n            </div>")
}

fn badge(class: &str, value: &str) -> String {
    format!("<span class=\"badge {}\">{}</span>", class, value)
}

fn write_brokers(out: &mut String, snapshot: &ClusterSnapshot) -> std::fmt::Result {
    write_table_start(
        out,
        "Kafka Brokers",
        &["Broker ID", "Address", "Version", "Partitions", "Leaders", "Under-Replicated"],
    )?;

    for broker in &snapshot.brokers {
        let urp_class = if broker.under_replicated_partitions > 0 {
            "badge-warning"
        } else {
            "badge-success"
        };
        writeln!(out, "                        <tr>")?;
        writeln!(out, "                            <td>{}</td>", badge("badge-info", &broker.id.to_string()))?;
        writeln!(out, "                            <td>{}</td>", html_escape(&broker.address))?;
        writeln!(
            out,
            "                            <td>{}</td>",
            badge("badge-success", &html_escape(&broker.version))
        )?;
        writeln!(
            out,
            "                            <td>{}</td>",
            badge("badge-info", &broker.partitions.to_string())
        )?;
        writeln!(
            out,
            "                            <td>{}</td>",
            badge("badge-info", &broker.leaders.to_string())
        )?;
        writeln!(
            out,
            "                            <td>{}</td>",
            badge(urp_class, &broker.under_replicated_partitions.to_string())
        )?;
        writeln!(out, "                        </tr>")?;
    }

    write_table_end(out)
}

fn write_topics(out: &mut String, snapshot: &ClusterSnapshot) -> std::fmt::Result {
    write_table_start(
        out,
        "Topics Overview",
        &["Topic Name", "Partitions", "Replication Factor", "Messages", "Custom Configurations"],
    )?;

    for topic in &snapshot.topics {
        let configs = if topic.configs.is_empty() {
            "<em>Default</em>".to_string()
        } else {
            html_escape(&config_pairs(&topic.configs).join(", "))
        };

        writeln!(out, "                        <tr>")?;
        writeln!(out, "                            <td class=\"name\">{}</td>", html_escape(&topic.name))?;
        writeln!(
            out,
            "                            <td>{}</td>",
            badge("badge-info", &topic.partitions.to_string())
        )?;
        writeln!(
            out,
            "                            <td>{}</td>",
            badge("badge-success", &topic.replication_factor.to_string())
        )?;
        writeln!(
            out,
            "                            <td>{}</td>",
            html_escape(&format_number(topic.total_messages))
        )?;
        writeln!(out, "                            <td class=\"details\">{}</td>", configs)?;
        writeln!(out, "                        </tr>")?;
    }

    write_table_end(out)
}

fn write_consumer_groups(out: &mut String, snapshot: &ClusterSnapshot) -> std::fmt::Result {
    write_table_start(
        out,
        "Consumer Groups",
        &["Group Name", "State", "Members", "Subscribed Topics"],
    )?;

    for group in &snapshot.consumer_groups {
        let topics = if group.topics.is_empty() {
            "<em>None</em>".to_string()
        } else {
            html_escape(&group.topics.join(", "))
        };
        let state_class = if group.state == STABLE_STATE {
            "badge-success"
        } else {
            "badge-warning"
        };

        writeln!(out, "                        <tr>")?;
        writeln!(out, "                            <td class=\"name\">{}</td>", html_escape(&group.name))?;
        writeln!(
            out,
            "                            <td>{}</td>",
            badge(state_class, &html_escape(&group.state))
        )?;
        writeln!(
            out,
            "                            <td>{}</td>",
            badge("badge-info", &group.members.to_string())
        )?;
        writeln!(out, "                            <td class=\"details\">{}</td>", topics)?;
        writeln!(out, "                        </tr>")?;
    }

    write_table_end(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::fixtures;

    #[test]
    fn test_configs_sorted_or_default() {
        let html = render_html(&fixtures::snapshot());

        assert!(html.contains("cleanup.policy=delete, retention.ms=86400000"));
        assert!(html.contains("<em>Default</em>"));
    }

    #[test]
    fn test_groups_without_topics_and_unstable_state() {
        let html = render_html(&fixtures::snapshot());

        assert!(html.contains("<em>None</em>"));
        assert!(html.contains("<span class=\"badge badge-warning\">Empty</span>"));
        assert!(html.contains("<span class=\"badge badge-success\">Stable</span>"));
    }

    #[test]
    fn test_under_replicated_card_only_when_needed() {
        let mut snapshot = fixtures::snapshot();
        assert!(!render_html(&snapshot).contains("Under-Replicated</div>"));

        snapshot.total_under_replicated_partitions = 4;
        let html = render_html(&snapshot);
        assert!(html.contains("stat-card alert"));
        assert!(html.contains("Under-Replicated</div>"));
    }

    #[test]
    fn test_names_are_escaped() {
        let mut snapshot = fixtures::snapshot();
        snapshot.consumer_groups[0].name = "<script>".to_string();

        let html = render_html(&snapshot);

        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }
}
