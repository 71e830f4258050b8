//! Multi-line pretty JSON and boundary behaviors, end to end through the
//! parser's public surface.

use mtgc_core::{FakeClock, LogEventKind};
use mtgc_parser::{Parser, ParserConfig};

fn parser() -> Parser<FakeClock> {
    Parser::new(ParserConfig::default(), FakeClock::default())
}

#[test]
fn multi_line_pretty_json_is_one_event() {
    let mut parser = parser();
    let stream = "<== EventGetCoursesV2\n{\n  \"Courses\": [\n    {\"CourseId\":\"a\"}\n  ]\n}\n";

    let events: Vec<_> = stream
        .lines()
        .flat_map(|line| parser.push_line(line))
        .collect();

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, LogEventKind::EventGetCoursesV2);
    assert_eq!(events[0].payload["Courses"][0]["CourseId"], "a");
}

#[test]
fn one_object_split_across_many_reads_is_one_event() {
    let mut parser = parser();
    // The tailer frames on line boundaries, so N reads arrive as the same
    // physical lines regardless of where the writer's flushes fell.
    let lines = ["{", "  \"GameNumber\": 1,", "  \"Result\": \"win\"", "}"];

    let mut events = Vec::new();
    for chunk in lines.chunks(1) {
        for line in chunk {
            events.extend(parser.push_line(line));
        }
    }

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].payload["GameNumber"], 1);
}

#[test]
fn rotation_mid_object_skips_partial_then_resumes() {
    let mut parser = parser();

    assert!(parser.push_line("{").is_empty());
    assert!(parser.push_line("  \"interrupted\": 1,").is_empty());

    parser.note_rotation();
    assert_eq!(parser.metrics().malformed_skipped, 1);

    let events = parser.push_line(r#"{"clean": true}"#);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].payload["clean"], true);
}

#[test]
fn every_emitted_event_is_within_the_taxonomy() {
    let mut parser = parser();
    let stream = concat!(
        "==> DraftPack {\"PackNumber\": 1}\n",
        "==> TotallyNewMarker {\"x\": 1}\n",
        "{\"InternalEventName\": \"RankUpdate\"}\n",
        "{\"no_marker\": true}\n",
    );

    let events: Vec<_> = stream
        .lines()
        .flat_map(|line| parser.push_line(line))
        .collect();

    assert_eq!(events.len(), 4);
    assert_eq!(events[0].kind, LogEventKind::DraftPack);
    assert_eq!(
        events[1].kind,
        LogEventKind::Other("TotallyNewMarker".to_string())
    );
    assert_eq!(events[2].kind, LogEventKind::RankUpdate);
    assert!(matches!(events[3].kind, LogEventKind::Other(_)));
}
