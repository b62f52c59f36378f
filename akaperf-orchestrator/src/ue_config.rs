//! UE configuration variants.
//!
//! Each launched UE client reads its own YAML configuration, derived from a
//! base template by rewriting the subscriber identity (`supi:`) line. The
//! template itself is never modified, and variant generation is
//! deterministic: the last `width` digits of the template identity are
//! replaced with the zero-padded UE index, so re-running with the same
//! index overwrites the variant with identical content.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use akaperf_common::Error;

/// One generated UE configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UeVariant {
    /// 1-based UE index within the cell
    pub index: u32,
    /// Full subscriber identity written into the variant
    pub supi: String,
    /// Path of the variant file
    pub path: PathBuf,
}

/// Rewrites the identity digits of a `supi:` line.
///
/// Returns the rewritten line and the full identity token it now carries
/// (e.g. `imsi-001010000000007`).
fn rewrite_supi_line(line: &str, index: u32, width: usize) -> Result<(String, String), Error> {
    if width == 0 || width > 10 {
        return Err(Error::Template(format!("identity index width {width} out of range")));
    }
    if u64::from(index) >= 10u64.pow(width as u32) {
        return Err(Error::Template(format!(
            "UE index {index} does not fit in {width} identity digits"
        )));
    }

    let bytes = line.as_bytes();
    let end = bytes
        .iter()
        .rposition(|b| b.is_ascii_digit())
        .ok_or_else(|| Error::Template("supi line carries no identity digits".into()))?;
    let mut start = end;
    while start > 0 && bytes[start - 1].is_ascii_digit() {
        start -= 1;
    }
    if end + 1 - start < width {
        return Err(Error::Template(format!(
            "identity tail has fewer than {width} digits: {}",
            &line[start..=end]
        )));
    }

    let keep = end + 1 - width;
    let rewritten = format!("{}{index:0width$}{}", &line[..keep], &line[end + 1..]);

    // Expand left over the identity token (covers the "imsi-" prefix)
    let mut token_start = start;
    while token_start > 0 {
        let c = bytes[token_start - 1];
        if c.is_ascii_alphanumeric() || c == b'-' {
            token_start -= 1;
        } else {
            break;
        }
    }
    let supi = format!("{}{index:0width$}", &line[token_start..keep]);

    Ok((rewritten, supi))
}

/// Renders one variant of the template in memory.
///
/// Only the first `supi:` line changes; every other line is preserved.
pub fn render_variant(template: &str, index: u32, width: usize) -> Result<(String, String), Error> {
    let mut supi = None;
    let mut lines = Vec::new();

    for line in template.lines() {
        if supi.is_none() && line.trim_start().starts_with("supi:") {
            let (rewritten, identity) = rewrite_supi_line(line, index, width)?;
            supi = Some(identity);
            lines.push(rewritten);
        } else {
            lines.push(line.to_string());
        }
    }

    let supi = supi.ok_or_else(|| Error::Template("template has no supi: line".into()))?;
    let mut content = lines.join("\n");
    if template.ends_with('\n') {
        content.push('\n');
    }
    Ok((content, supi))
}

/// Writes `ue_count` configuration variants of the template into `out_dir`.
///
/// Variant files are named `ue_<index>.yaml` with the index zero-padded to
/// `width` digits. Existing files are overwritten.
pub fn write_variants(
    template_path: &Path,
    out_dir: &Path,
    ue_count: u32,
    width: usize,
) -> Result<Vec<UeVariant>, Error> {
    let template = fs::read_to_string(template_path).map_err(|e| {
        Error::Template(format!("failed to read template {}: {e}", template_path.display()))
    })?;
    fs::create_dir_all(out_dir)?;

    let mut variants = Vec::with_capacity(ue_count as usize);
    for index in 1..=ue_count {
        let (content, supi) = render_variant(&template, index, width)?;
        let path = out_dir.join(format!("ue_{index:0width$}.yaml"));
        fs::write(&path, content)?;
        variants.push(UeVariant { index, supi, path });
    }

    info!("Wrote {} UE config variants to {}", variants.len(), out_dir.display());
    Ok(variants)
}
