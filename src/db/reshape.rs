use crate::models::{Language, Situation, TipCollection, TipEntry, TipRow};

#[derive(Debug, Default)]
pub struct Reshaped {
    pub tips: TipCollection,
    /// Rows dropped for missing or unrecognised required fields.
    pub skipped: usize,
}

/// Groups flat rows into situation -> language -> tips, keeping row order
/// within each bucket.
pub fn reshape(rows: Vec<TipRow>) -> Reshaped {
    let mut reshaped = Reshaped::default();

    for row in rows {
        if !row.is_active {
            tracing::debug!("Dropping inactive tip {}", row.id);
            continue;
        }

        let situation = row.situation.as_deref().and_then(|s| s.parse::<Situation>().ok());
        let language = row.language.as_deref().and_then(|l| l.parse::<Language>().ok());

        let (Some(situation), Some(language), Some(content)) = (situation, language, row.content)
        else {
            tracing::warn!("Skipping malformed tip row {}", row.id);
            reshaped.skipped += 1;
            continue;
        };

        reshaped.tips.push(
            situation,
            language,
            TipEntry {
                id: row.id,
                content,
                display_count: row.display_count,
                likes: row.likes,
            },
        );
    }

    reshaped
}
