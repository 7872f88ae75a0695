use anyhow::Result;
use fra_core::query::ClaimStatistics;
use fra_core::schema::{Claim, ClaimStatus, ClaimType, Snapshot};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::info;

pub struct VaultPaths {
    pub root: PathBuf,
    pub index_dir: PathBuf,
    pub claims_dir: PathBuf,
}

impl VaultPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            index_dir: root.join("00_Index"),
            claims_dir: root.join("Claims"),
            root,
        }
    }

    pub fn ensure(&self) -> Result<()> {
        fs::create_dir_all(&self.index_dir)?;
        fs::create_dir_all(&self.claims_dir)?;
        Ok(())
    }
}

/// Claim ids come from imported data, so note names are derived from them
/// with [`note_name`] and never used as paths directly.
pub fn build_vault(
    snapshot: &Snapshot,
    stats: &ClaimStatistics,
    vault_root: &Path,
    generated_at: OffsetDateTime,
) -> Result<()> {
    let paths = VaultPaths::new(vault_root);
    paths.ensure()?;

    // 1) Claim notes, most recently updated first
    let mut claims: Vec<&Claim> = snapshot.claims.iter().collect();
    claims.sort_by(|a, b| b.last_updated.cmp(&a.last_updated).then_with(|| a.id.cmp(&b.id)));

    let mut index_lines: Vec<String> = Vec::new();
    index_lines.push("# MOC - Claims".to_string());
    index_lines.push(String::new());
    index_lines.push("This index is generated. Do not edit manually.".to_string());
    index_lines.push(String::new());

    let mut used: HashSet<String> = HashSet::new();
    for claim in &claims {
        let base = note_name(&claim.id);
        let name = (1..)
            .map(|n| if n == 1 { base.clone() } else { format!("{base}_{n}") })
            .find(|candidate| !used.contains(candidate))
            .unwrap_or_else(|| base.clone());
        used.insert(name.clone());

        write_claim_note(&paths, &name, claim)?;
        index_lines.push(format!(
            "- [[Claims/{}|{}]] `{}` {}",
            name, claim.name, claim.claim_type, claim.status
        ));
    }
    if claims.is_empty() {
        index_lines.push("_No claims found._".to_string());
    }

    // 2) Write MOC
    let moc_path = paths.index_dir.join("MOC - Claims.md");
    fs::write(moc_path, index_lines.join("\n"))?;

    // 3) Analytics note
    let analytics_path = paths.index_dir.join("Analytics.md");
    fs::write(analytics_path, analytics_note(stats, snapshot, generated_at)?)?;

    info!(
        root = %paths.root.display(),
        claims = claims.len(),
        "vault written"
    );
    Ok(())
}

/// File stem for a claim note: path separators, `..` and anything that
/// would break a wiki link become `_`.
pub fn note_name(id: &str) -> String {
    let mapped: String = id
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let mut name = mapped.replace("..", "_");
    if name.starts_with('.') {
        name.replace_range(..1, "_");
    }
    if name.is_empty() {
        name.push('_');
    }
    name
}

fn write_claim_note(paths: &VaultPaths, name: &str, claim: &Claim) -> Result<()> {
    let note_path = paths.claims_dir.join(format!("{name}.md"));

    let mut md = String::new();
    md.push_str("---\n");
    md.push_str(&format!("id: {}\n", claim.id));
    md.push_str(&format!("claim_type: {}\n", claim.claim_type));
    md.push_str(&format!("status: {}\n", claim.status));
    md.push_str(&format!("state: {}\n", claim.state));
    md.push_str(&format!("district: {}\n", claim.district));
    md.push_str(&format!("submitted: {}\n", claim.submitted_date));
    md.push_str(&format!("last_updated: {}\n", claim.last_updated));
    md.push_str("---\n\n");

    md.push_str(&format!("# {}\n\n", claim.name));

    md.push_str("## Claim\n");
    md.push_str(&format!(
        "- Type: `{}` ({})\n",
        claim.claim_type,
        claim.claim_type.label()
    ));
    md.push_str(&format!("- Status: {}\n", claim.status.label()));
    md.push_str(&format!("- Area: {:.2} hectares\n\n", claim.area));

    md.push_str("## Location\n");
    md.push_str(&format!("- State: {}\n", claim.state));
    md.push_str(&format!("- District: {}\n", claim.district));
    md.push_str(&format!(
        "- Coordinates: {:.6}, {:.6}\n\n",
        claim.coordinates.lat(),
        claim.coordinates.lng()
    ));

    md.push_str("## Documents\n");
    match &claim.documents {
        Some(docs) if !docs.is_empty() => {
            for doc in docs {
                md.push_str(&format!("- {doc}\n"));
            }
        }
        _ => md.push_str("_No documents attached._\n"),
    }
    md.push('\n');

    md.push_str("## Description\n");
    match &claim.description {
        Some(t) if !t.trim().is_empty() => {
            md.push_str(t);
            md.push('\n');
        }
        _ => {
            md.push_str("_No description available._\n");
        }
    }

    fs::write(note_path, md)?;
    Ok(())
}

fn analytics_note(
    stats: &ClaimStatistics,
    snapshot: &Snapshot,
    generated_at: OffsetDateTime,
) -> Result<String> {
    let mut lines: Vec<String> = Vec::new();
    lines.push("# Claims Analytics".to_string());
    lines.push(String::new());
    lines.push(format!("Generated {}.", generated_at.format(&Rfc3339)?));
    lines.push(String::new());

    lines.push("## Summary".to_string());
    lines.push(String::new());
    lines.push(format!("- Total claims: {}", stats.total));
    lines.push(format!("- Total area: {:.1} ha", stats.total_area));
    lines.push(format!("- Average area: {:.1} ha", stats.avg_area));
    lines.push(format!("- Villages: {}", snapshot.villages.len()));
    lines.push(format!("- Features: {}", snapshot.features.len()));
    lines.push(String::new());

    lines.push("## By Status".to_string());
    lines.push(String::new());
    for status in [
        ClaimStatus::Pending,
        ClaimStatus::Approved,
        ClaimStatus::UnderReview,
        ClaimStatus::Rejected,
    ] {
        lines.push(format!(
            "- {}: {} ({:.1}%)",
            status.label(),
            stats.by_status.get(status),
            stats.status_percentage(status)
        ));
    }
    lines.push(String::new());

    lines.push("## By Type".to_string());
    lines.push(String::new());
    for claim_type in ClaimType::ALL {
        lines.push(format!(
            "- {} ({}): {}",
            claim_type.label(),
            claim_type,
            stats.by_type.get(claim_type)
        ));
    }
    lines.push(String::new());

    lines.push("## By State".to_string());
    lines.push(String::new());
    if stats.by_state.is_empty() {
        lines.push("_No claims found._".to_string());
    } else {
        for entry in &stats.by_state {
            lines.push(format!("- {} ({})", entry.state, entry.count));
        }
    }
    lines.push(String::new());

    Ok(lines.join("\n"))
}
