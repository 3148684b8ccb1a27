//! Hypnogram command for printing the reconciled stage timeline.

use std::collections::BTreeMap;
use std::io::Write;

use anyhow::Result;
use hs_core::{Bounds, Breakpoint, EventId, Segment};
use hs_db::Database;
use serde::Serialize;

use super::util::Scoring;
use crate::Config;

#[derive(Debug, Serialize)]
struct HypnogramOutput<'a> {
    duration: f64,
    breakpoints: &'a [Breakpoint],
    segments: Vec<Segment>,
    totals: BTreeMap<String, f64>,
}

/// Prints the hypnogram, optionally previewing an unsaved move of one event.
pub fn run<W: Write>(
    writer: &mut W,
    db: &Database,
    config: &Config,
    recording: &str,
    preview: Option<(u64, Bounds)>,
    json: bool,
) -> Result<()> {
    let mut scoring = Scoring::open(db, config, recording)?;
    if let Some((id, bounds)) = preview {
        scoring.session.begin_drag(EventId::new(id))?;
        scoring.session.drag_to(bounds)?;
    }

    let hypnogram = scoring.session.hypnogram()?;
    let catalog = scoring.catalog();
    let segments = hypnogram.segments();

    if json {
        let output = HypnogramOutput {
            duration: hypnogram.duration(),
            breakpoints: hypnogram.breakpoints(),
            totals: hypnogram
                .stage_durations()
                .into_iter()
                .map(|(stage, seconds)| (catalog.label(stage), seconds))
                .collect(),
            segments,
        };
        writeln!(writer, "{}", serde_json::to_string_pretty(&output)?)?;
        return Ok(());
    }

    for segment in &segments {
        writeln!(
            writer,
            "{:<9}{:<9}{}",
            segment.start,
            segment.end,
            catalog.label(segment.stage)
        )?;
    }
    writeln!(writer, "Totals:")?;
    for (stage, seconds) in hypnogram.stage_durations() {
        writeln!(writer, "  {:<10}{seconds}s", catalog.label(stage))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use insta::assert_snapshot;

    use crate::commands::util::tests::{config, scored_night};

    #[test]
    fn hypnogram_command_prints_segments_and_totals() {
        let mut db = Database::open_in_memory().unwrap();
        let config = config();
        scored_night(&mut db, &config);

        let mut output = Vec::new();
        run(&mut output, &db, &config, "night1", None, false).unwrap();

        assert_snapshot!(String::from_utf8(output).unwrap(), @r"
        0        100      Wake
        100      120      N2
        120      180      Artifact
        180      200      N2
        200      300      REM
        Totals:
          N2        40s
          REM       100s
          Wake      100s
          Artifact  60s
        ");
    }

    #[test]
    fn preview_moves_event_without_saving() {
        let mut db = Database::open_in_memory().unwrap();
        let config = config();
        scored_night(&mut db, &config);

        let mut output = Vec::new();
        run(
            &mut output,
            &db,
            &config,
            "night1",
            Some((2, Bounds::point(110.0))),
            true,
        )
        .unwrap();

        let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
        let times: Vec<f64> = value["breakpoints"]
            .as_array()
            .unwrap()
            .iter()
            .map(|bp| bp["time"].as_f64().unwrap())
            .collect();
        assert_eq!(times, vec![0.0, 110.0, 120.0, 180.0, 200.0, 300.0]);
        assert_eq!(value["totals"]["N2"], serde_json::json!(30.0));

        let stored = Scoring::open(&db, &config, "night1").unwrap();
        let n2 = stored.session.store().list_events().nth(1).unwrap();
        assert_eq!(n2.bounds, Bounds::point(100.0));
    }

    #[test]
    fn preview_of_missing_event_fails() {
        let mut db = Database::open_in_memory().unwrap();
        let config = config();
        scored_night(&mut db, &config);

        assert!(
            run(
                &mut Vec::new(),
                &db,
                &config,
                "night1",
                Some((9, Bounds::point(1.0))),
                false,
            )
            .is_err()
        );
    }
}
