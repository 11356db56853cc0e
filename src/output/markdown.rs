//! Markdown summary generation
//!
//! This module generates a human-readable markdown report of a finished crawl.

use crate::output::stats::CrawlSummary;
use crate::output::OutputResult;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Timestamp format used in the report
const REPORT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Writes a markdown report of a crawl to `output_path`
///
/// # Arguments
///
/// * `summary` - The crawl summary data
/// * `output_path` - Path where the markdown file should be written
pub fn generate_markdown_summary(summary: &CrawlSummary, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_summary(summary);

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a crawl summary as markdown
pub fn format_markdown_summary(summary: &CrawlSummary) -> String {
    let mut md = String::new();

    md.push_str("# Site-Harvest Crawl Summary\n\n");

    // Run metadata
    md.push_str("## Run Information\n\n");
    md.push_str(&format!(
        "- **Started**: {}\n",
        summary.started_at.format(REPORT_TIME_FORMAT)
    ));
    md.push_str(&format!(
        "- **Finished**: {}\n",
        summary.finished_at.format(REPORT_TIME_FORMAT)
    ));
    md.push_str(&format!(
        "- **Duration**: {:.1} seconds ({:.2} minutes)\n",
        summary.duration_secs,
        summary.duration_secs / 60.0
    ));
    md.push_str(&format!(
        "- **Output Directory**: {}\n",
        summary.output_root.display()
    ));
    if let Some(hash) = &summary.config_hash {
        md.push_str(&format!("- **Config Hash**: {}\n", hash));
    }
    let stop_reason = if summary.cap_reached {
        "page cap reached"
    } else {
        "frontier exhausted"
    };
    md.push_str(&format!("- **Stopped**: {}\n\n", stop_reason));

    // Page outcomes
    md.push_str("## Pages\n\n");
    md.push_str("| Outcome | Count |\n");
    md.push_str("|---------|-------|\n");
    md.push_str(&format!("| Visited | {} |\n", summary.pages_visited));
    md.push_str(&format!("| Saved | {} |\n", summary.pages_saved));
    md.push_str(&format!("| No Content | {} |\n", summary.pages_no_content));
    md.push_str(&format!(
        "| Fetch Failed | {} |\n",
        summary.total_fetch_failures()
    ));
    md.push_str(&format!("| Write Failed | {} |\n\n", summary.write_failures));

    md.push_str(&format!("- **Files Written**: {}\n", summary.files_written));
    md.push_str(&format!("- **Links Enqueued**: {}\n", summary.links_enqueued));
    md.push_str(&format!("- **Save Rate**: {:.2}%\n\n", summary.save_rate()));

    // Images
    md.push_str("## Images\n\n");
    md.push_str(&format!("- **Downloaded**: {}\n", summary.assets.downloaded));
    md.push_str(&format!("- **Reused**: {}\n", summary.assets.reused));
    md.push_str(&format!("- **Failed**: {}\n", summary.assets.failed));
    md.push_str(&format!(
        "- **References Rewritten**: {}\n\n",
        summary.images_rewritten
    ));

    // Fetch failures by kind
    if !summary.fetch_failures.is_empty() {
        md.push_str("## Fetch Failures\n\n");
        md.push_str("| Kind | Count |\n");
        md.push_str("|------|-------|\n");
        for (kind, count) in &summary.fetch_failures {
            md.push_str(&format!("| {} | {} |\n", kind, count));
        }
        md.push('\n');
    }

    md
}
