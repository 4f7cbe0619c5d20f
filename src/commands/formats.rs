//! Formats command implementation.
//!
//! Prints the supported tools and what zprogress can show for each.

use crate::process::ArchiveTool;

/// Table of supported tools, also used as `--help` trailer.
pub fn formats_table() -> String {
    let mut out = String::from("Supported formats:\n");
    out.push_str(&format!(
        "  {:<8} {:<20} {}\n",
        "TOOL", "EXTENSIONS", "UNCOMPRESSED SIZE"
    ));
    for tool in ArchiveTool::ALL {
        out.push_str(&format!(
            "  {:<8} {:<20} {}\n",
            tool.name(),
            tool.extensions().join(" "),
            if tool.reports_uncompressed_size() {
                "yes"
            } else {
                "no"
            }
        ));
    }
    out.push_str(
        "\nDecompression shows percent, rate and ETA against the archive size.\n\
         Compression shows bytes read and written, ratio and rates.",
    );
    out
}

/// Prints the supported-format table.
pub fn command_formats() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", formats_table());
    Ok(())
}
