use crate::markup::types::{LocalStamp, MarkupEntry, Timeframe};

/// Entries written to an empty journal so the first views are not blank.
pub fn sample_markups() -> Vec<MarkupEntry> {
    let seeds: [(&str, &str, Timeframe, &str, &str); 4] = [
        (
            "seed-1",
            "2023-03-15T09:15",
            Timeframe::M15,
            "Breakout",
            "Cassure de range + retest. Confluence avec ouverture London.",
        ),
        (
            "seed-2",
            "2023-03-15T14:35",
            Timeframe::M15,
            "Liquidity sweep",
            "Sweep du plus haut de session puis rejet.",
        ),
        (
            "seed-3",
            "2023-03-21T10:05",
            Timeframe::M5,
            "Reversal (M5)",
            "Divergence + niveau H1.",
        ),
        (
            "seed-4",
            "2024-01-13T15:10",
            Timeframe::H1,
            "Trend continuation (H1)",
            "Pullback sur MA + structure HL/HH.",
        ),
    ];

    seeds
        .into_iter()
        .filter_map(|(id, at, timeframe, strategy, notes)| {
            let stamp = LocalStamp::parse(at).ok()?;
            let mut entry = MarkupEntry::new(id, stamp, "MSU", timeframe);
            entry.strategy = strategy.to_string();
            entry.notes = Some(notes.to_string());
            Some(entry)
        })
        .collect()
}
