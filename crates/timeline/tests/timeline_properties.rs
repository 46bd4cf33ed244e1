use proptest::prelude::*;

use inkcast_common::clock::TimeMs;
use inkcast_session_model::{
    Event, EventId, MarkerKind, Point2D, PointBuffer, PointerSample, Rgb, Stroke, StrokeSample,
    Timed, TrimOutcome,
};
use inkcast_timeline::{EditController, EventLog, RecordingBackend, ReplayEngine};

/// A closed pen stroke over `[start, end]` with a sample, and a point,
/// every 10 ms.
fn stroke_event(
    log: &mut EventLog,
    start: TimeMs,
    end: TimeMs,
    color: Rgb,
    points: &mut PointBuffer,
) -> Event {
    let pb_start = points.len();
    let sample = |time: TimeMs, points: &mut PointBuffer| {
        let pos = Point2D::new(((time % 100) as f64) / 100.0, 0.0);
        StrokeSample::new(time, pos, points.add_point(pos))
    };
    let first = sample(start, points);
    let mut ev = Event::stroke(
        log.next_id(),
        start,
        Stroke::pen(color, 2.0, pb_start),
        first,
    );
    let mut s = start + 10;
    while s < end {
        ev.push_stroke_sample(sample(s, points));
        s += 10;
    }
    if end > start {
        ev.push_stroke_sample(sample(end, points));
    }
    ev.close(end);
    ev
}

/// Record back-to-back strokes into `points`. Each span is `(gap, duration)`
/// after the previous stroke's end.
fn record(spans: &[(TimeMs, TimeMs)], points: &mut PointBuffer) -> EventLog {
    let mut log = EventLog::new();
    let mut t = 0;
    for (i, &(gap, dur)) in spans.iter().enumerate() {
        let start = t + gap;
        let end = start + dur;
        let color = if i % 2 == 0 { Rgb::BLACK } else { Rgb::WHITE };
        let ev = stroke_event(&mut log, start, end, color, points);
        log.insert_sorted(ev);
        t = end;
    }
    log
}

/// One recorded item of a log whose events may overlap in time.
#[derive(Debug, Clone, Copy)]
enum Item {
    Stroke { start: TimeMs, dur: TimeMs },
    Pointer { start: TimeMs, dur: TimeMs },
    Marker { at: TimeMs },
}

fn items() -> impl Strategy<Value = Vec<Item>> {
    let item = prop_oneof![
        (0i64..1500, 0i64..300).prop_map(|(start, dur)| Item::Stroke { start, dur }),
        (0i64..1500, 0i64..300).prop_map(|(start, dur)| Item::Pointer { start, dur }),
        (0i64..1500).prop_map(|at| Item::Marker { at }),
    ];
    prop::collection::vec(item, 1..16)
}

/// Record `items` in order. Strokes, pointer movement and markers overlap
/// freely; stroke geometry is still appended one stroke at a time.
fn record_mixed(items: &[Item], points: &mut PointBuffer) -> EventLog {
    let mut log = EventLog::new();
    for item in items {
        let ev = match *item {
            Item::Stroke { start, dur } => {
                stroke_event(&mut log, start, start + dur, Rgb::BLACK, points)
            }
            Item::Pointer { start, dur } => {
                let mut ev = Event::pointer(log.next_id(), start, Point2D::new(0.0, 0.0));
                let mut s = start + 10;
                while s <= start + dur {
                    ev.push_pointer_sample(PointerSample::new(s, Point2D::new(0.1, 0.1)));
                    s += 10;
                }
                ev.close(start + dur);
                ev
            }
            Item::Marker { at } => Event::marker(log.next_id(), at, MarkerKind::Undo),
        };
        log.insert_sorted(ev);
    }
    log
}

fn shape(log: &EventLog) -> Vec<(TimeMs, Option<TimeMs>, Vec<TimeMs>)> {
    log.iter()
        .map(|e| {
            let times = e
                .as_stroke()
                .map(|s| s.samples.iter().map(Timed::time).collect())
                .unwrap_or_default();
            (e.start_time, e.end_time, times)
        })
        .collect()
}

fn assert_well_formed(log: &EventLog) -> Result<(), TestCaseError> {
    prop_assert!(log.is_sorted());
    for ev in log.iter() {
        prop_assert!(ev.sample_count() > 0);
        prop_assert!(ev.samples_well_formed());
        let end = ev.end_time.unwrap_or(ev.start_time);
        prop_assert!(end >= ev.start_time);
    }
    Ok(())
}

fn spans() -> impl Strategy<Value = Vec<(TimeMs, TimeMs)>> {
    prop::collection::vec((1i64..60, 0i64..120), 1..12)
}

#[derive(Debug, Clone)]
enum Op {
    Delete { from: TimeMs, len: TimeMs },
    CopyPaste { from: TimeMs, len: TimeMs, at: TimeMs },
    ScalePaste { from: TimeMs, len: TimeMs, scale: f64, at: TimeMs },
    Move { from: TimeMs, len: TimeMs, dt: TimeMs, scale: f64 },
}

fn op() -> impl Strategy<Value = Op> {
    let window = (0i64..1500, 1i64..400);
    prop_oneof![
        window.clone().prop_map(|(from, len)| Op::Delete { from, len }),
        (window.clone(), 0i64..2000)
            .prop_map(|((from, len), at)| Op::CopyPaste { from, len, at }),
        (window.clone(), 0.25f64..4.0, 0i64..2000).prop_map(|((from, len), scale, at)| {
            Op::ScalePaste {
                from,
                len,
                scale,
                at,
            }
        }),
        (window, -500i64..500, 0.5f64..2.0).prop_map(|((from, len), dt, scale)| Op::Move {
            from,
            len,
            dt,
            scale,
        }),
    ]
}

fn apply(log: &mut EventLog, op: &Op) {
    let mut edit = EditController::new();
    match *op {
        Op::Delete { from, len } => {
            log.delete_range(from, from + len);
        }
        Op::CopyPaste { from, len, at } => {
            if edit.select(log, from, from + len, true).is_some()
                && edit.copy(log).unwrap_or(0) > 0
            {
                edit.paste(log, at).unwrap();
            }
        }
        Op::ScalePaste {
            from,
            len,
            scale,
            at,
        } => {
            if edit.select(log, from, from + len, false).is_some()
                && edit.copy(log).unwrap_or(0) > 0
            {
                edit.scale_selection(scale, 0).unwrap();
                edit.paste(log, at).unwrap();
            }
        }
        Op::Move {
            from,
            len,
            dt,
            scale,
        } => {
            if edit.select(log, from, from + len, false).is_some() {
                edit.begin_move(log).unwrap();
                edit.commit_move(log, 3000, dt, scale).unwrap();
            }
        }
    }
}

proptest! {
    #[test]
    fn prop_log_stays_sorted_under_edits(
        spans in spans(),
        ops in prop::collection::vec(op(), 1..8),
    ) {
        let mut points = PointBuffer::default();
        let mut log = record(&spans, &mut points);
        for op in &ops {
            apply(&mut log, op);
            assert_well_formed(&log)?;
        }
    }

    #[test]
    fn prop_overlapping_log_stays_sorted_under_edits(
        items in items(),
        ops in prop::collection::vec(op(), 1..8),
    ) {
        let mut points = PointBuffer::default();
        let mut log = record_mixed(&items, &mut points);
        assert_well_formed(&log)?;
        for op in &ops {
            apply(&mut log, op);
            assert_well_formed(&log)?;
        }
    }

    #[test]
    fn prop_exact_copy_paste_keeps_relative_times(
        items in items(),
        from in 0i64..1500,
        len in 1i64..400,
        at in 0i64..2000,
    ) {
        let mut points = PointBuffer::default();
        let mut log = record_mixed(&items, &mut points);
        let before = log.len();

        let mut edit = EditController::new();
        if edit.select(&log, from, from + len, true).is_none()
            || edit.copy(&mut log).unwrap() == 0
        {
            return Ok(());
        }
        let clipboard = edit.clipboard().to_vec();
        let earliest = clipboard.iter().map(|e| e.start_time).min().unwrap();
        prop_assert!(earliest >= from);

        let ids = edit.paste(&mut log, at).unwrap();
        assert_well_formed(&log)?;
        prop_assert_eq!(log.len(), before + clipboard.len());

        let mut expected: Vec<TimeMs> = clipboard
            .iter()
            .map(|e| e.start_time - earliest + at)
            .collect();
        let mut pasted: Vec<TimeMs> = ids
            .iter()
            .map(|id| log.get(*id).unwrap().start_time)
            .collect();
        expected.sort_unstable();
        pasted.sort_unstable();
        prop_assert_eq!(pasted[0], at);
        prop_assert_eq!(pasted, expected);
    }

    #[test]
    fn prop_copy_delete_paste_restores(
        spans in spans(),
        from in 0i64..1500,
        len in 1i64..600,
    ) {
        let mut points = PointBuffer::default();
        let mut log = record(&spans, &mut points);
        let before = shape(&log);

        let mut edit = EditController::new();
        let Some(sel) = edit.select(&log, from, from + len, false) else {
            return Ok(());
        };
        let copied = edit.copy(&mut log).unwrap();
        let summary = edit.delete(&mut log).unwrap();
        prop_assert_eq!(summary.removed, copied);
        prop_assert_eq!(log.len(), before.len() - copied);

        edit.paste(&mut log, sel.from).unwrap();
        prop_assert_eq!(shape(&log), before);
    }

    #[test]
    fn prop_full_replay_is_idempotent(spans in spans(), t in 0i64..2000) {
        let mut points = PointBuffer::default();
        let mut log = record(&spans, &mut points);
        let mut engine = ReplayEngine::new();

        let mut first = RecordingBackend::new();
        engine.full_replay(&mut log, &points, t, &mut first);
        let mut second = RecordingBackend::new();
        engine.full_replay(&mut log, &points, t, &mut second);
        prop_assert_eq!(first.requests, second.requests);
        prop_assert_eq!(first.cursor, second.cursor);
    }

    #[test]
    fn prop_incremental_matches_full(
        spans in spans(),
        mut times in prop::collection::vec(0i64..2000, 1..20),
    ) {
        times.sort_unstable();
        let mut points = PointBuffer::default();
        let mut log = record(&spans, &mut points);

        let mut engine = ReplayEngine::new();
        let mut incremental = RecordingBackend::new();
        engine.full_replay(&mut log, &points, times[0], &mut incremental);
        for &t in &times[1..] {
            engine.incremental_replay(&mut log, &points, t, &mut incremental);
        }

        let last = times[times.len() - 1];
        let mut full = RecordingBackend::new();
        ReplayEngine::new().full_replay(&mut log, &points, last, &mut full);
        prop_assert_eq!(incremental.covered(), full.covered());
        prop_assert_eq!(incremental.cursor, full.cursor);
    }
}

#[test]
fn scenario_trim_from_drops_tail_samples() {
    let mut points = PointBuffer::default();
    let mut log = record(&[(0, 30)], &mut points);
    let mut events = log.copy_range(0..1);
    let ev = &mut events[0];
    assert_eq!(ev.start_time, 0);

    assert_eq!(ev.trim_from(15), TrimOutcome::Trimmed);
    let times: Vec<TimeMs> = ev
        .as_stroke()
        .unwrap()
        .samples
        .iter()
        .map(Timed::time)
        .collect();
    assert_eq!(times, vec![0, 10]);
    assert_eq!(ev.end_time, Some(10));
}

#[test]
fn scenario_delete_removes_fully_inside_event() {
    let mut points = PointBuffer::default();
    // Strokes at [20, 60], [120, 180] and [250, 300].
    let mut log = record(&[(20, 40), (60, 60), (70, 50)], &mut points);
    assert_eq!(log.events()[1].start_time, 120);
    assert_eq!(log.events()[1].end_time, Some(180));

    let summary = log.delete_range(100, 200);
    assert_eq!(summary.removed, 1);
    assert_eq!(summary.trimmed, 0);
    assert_eq!(log.len(), 2);
}

#[test]
fn scenario_paste_shifts_clipboard() {
    let mut points = PointBuffer::default();
    // Strokes at [50, 60] and [80, 90], then [400, 410] and [600, 610].
    let mut source = record(&[(50, 10), (20, 10)], &mut points);
    let clipboard = source.copy_range(0..2);
    let mut log = record(&[(400, 10), (190, 10)], &mut points);

    let ids = log.paste_at(&clipboard, 500);
    assert_eq!(ids.len(), 2);
    let starts: Vec<TimeMs> = log.iter().map(|e| e.start_time).collect();
    assert_eq!(starts, vec![400, 500, 530, 600]);
}

#[test]
fn scenario_scale_doubles_around_pivot() {
    let mut ev = Event::pointer(EventId(0), 100, Point2D::new(0.0, 0.0));
    ev.push_pointer_sample(PointerSample::new(150, Point2D::new(0.5, 0.5)));
    ev.close(150);

    ev.scale_and_move(2.0, 0, 100);
    assert_eq!(ev.start_time, 100);
    assert_eq!(ev.end_time, Some(200));
}
