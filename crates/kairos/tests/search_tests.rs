use chrono::{DateTime, TimeZone, Utc};
use kairos::aspects::{angular_separation, AspectKind};
use kairos::ephemeris::time::{days, days_between};
use kairos::{
    AspectWindowFinder, CelestialBody, EphemerisError, Position, PositionSource,
    RetrogradeDetector, SearchConfig, SearchDirection, TransitionFinder,
};
use std::f64::consts::PI;

const PRECISION: f64 = 1.0 / 1440.0;

fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
}

/// Longitude = start + rate * days, never retrograde.
struct Linear {
    start: f64,
    rate: f64,
}

impl PositionSource for Linear {
    fn position_of(&self, _body: CelestialBody, instant: DateTime<Utc>) -> Result<Position, EphemerisError> {
        Ok(Position::new(
            self.start + self.rate * days_between(epoch(), instant),
            self.rate,
        ))
    }
}

/// A planet-like loop: speed = 0.2 + 0.5 cos(2πd/120), so the body runs
/// forward, turns back between days ~37.9 and ~82.1, then moves on.
struct Looping;

const PERIOD: f64 = 120.0;

impl Looping {
    fn stations() -> (f64, f64) {
        let start = (-0.4f64).acos() * PERIOD / (2.0 * PI);
        (start, PERIOD - start)
    }
}

impl PositionSource for Looping {
    fn position_of(&self, _body: CelestialBody, instant: DateTime<Utc>) -> Result<Position, EphemerisError> {
        let d = days_between(epoch(), instant);
        let phase = 2.0 * PI * d / PERIOD;
        let lon = 0.2 * d + 0.5 * PERIOD / (2.0 * PI) * phase.sin();
        Ok(Position::new(lon, 0.2 + 0.5 * phase.cos()))
    }
}

#[test]
fn test_monotonic_crossing_within_precision() {
    let source = Linear { start: 355.0, rate: 0.37 };
    let finder = TransitionFinder::new(&source, SearchConfig::default());
    let t = finder
        .find_transition(
            CelestialBody::Jupiter,
            |p| p.sign_index == 11,
            epoch(),
            SearchDirection::Forward,
            100.0,
            1.0,
        )
        .unwrap();
    // crosses 360 / 0 Aries after 5 / 0.37 days
    let expected = 5.0 / 0.37;
    assert!((days_between(epoch(), t) - expected).abs() <= PRECISION);
}

#[test]
fn test_no_retrograde_for_direct_motion() {
    let source = Linear { start: 10.0, rate: 0.05 };
    let detector = RetrogradeDetector::new(&source, SearchConfig::default());
    for body in [CelestialBody::Mercury, CelestialBody::Saturn, CelestialBody::Pluto] {
        let intervals = detector
            .find_retrograde_intervals(body, epoch(), 730.0, 5.0, None)
            .unwrap();
        assert!(intervals.is_empty());
    }
}

#[test]
fn test_single_excursion_over_hundred_days() {
    let detector = RetrogradeDetector::new(&Looping, SearchConfig::default());
    let intervals = detector
        .find_retrograde_intervals(CelestialBody::Mars, epoch(), 100.0, 2.0, None)
        .unwrap();
    assert_eq!(intervals.len(), 1);

    let (start, end) = Looping::stations();
    let interval = &intervals[0];
    assert!((days_between(epoch(), interval.start) - start).abs() <= PRECISION);
    assert!((days_between(epoch(), interval.end) - end).abs() <= PRECISION);

    // speed negative inside, non-negative just outside
    let inside = epoch() + days((start + end) / 2.0);
    assert!(Looping.position_of(CelestialBody::Mars, inside).unwrap().retrograde);
    let after = interval.end + days(PRECISION);
    assert!(!Looping.position_of(CelestialBody::Mars, after).unwrap().retrograde);
    assert!(interval.contains(inside));
}

#[test]
fn test_retrograde_body_makes_three_separate_conjunctions() {
    let finder = AspectWindowFinder::new(&Looping, SearchConfig::default());
    let tolerance = 1.0;
    let natal = 12.0;
    let windows = finder
        .find_aspect_windows(
            CelestialBody::Mars,
            CelestialBody::Sun,
            natal,
            tolerance,
            epoch(),
            140.0,
            1.0,
        )
        .unwrap();
    assert_eq!(windows.len(), 3, "{windows:#?}");

    for w in &windows {
        assert_eq!(w.aspect.kind, AspectKind::Conjunction);
        assert!(w.window_start <= w.window_center && w.window_center <= w.window_end);
        assert!(!w.open_start && !w.open_end);
        assert!(w.orb_at_center < 0.01);
        for edge in [w.window_start, w.window_end] {
            let lon = Looping.position_of(CelestialBody::Mars, edge).unwrap().longitude;
            assert!((angular_separation(lon, natal) - tolerance).abs() < 0.01);
        }
    }
    for pair in windows.windows(2) {
        assert!(pair[0].window_end < pair[1].window_start);
        assert!(!pair[0].overlaps(&pair[1]));
    }

    // the middle pass happens while the body is retrograde
    let middle = Looping.position_of(CelestialBody::Mars, windows[1].window_center).unwrap();
    assert!(middle.retrograde);
}

#[test]
fn test_fast_body_switches_aspect_between_samples() {
    // 30 degrees a day sampled daily: every sample lands in a different
    // aspect, so each must come out as its own window
    let source = Linear { start: 60.0, rate: 30.0 };
    let finder = AspectWindowFinder::new(&source, SearchConfig::default());
    let windows = finder
        .find_aspect_windows(CelestialBody::Sun, CelestialBody::Sun, 0.0, 5.0, epoch(), 3.0, 1.0)
        .unwrap();
    let kinds: Vec<AspectKind> = windows.iter().map(|w| w.aspect.kind).collect();
    assert_eq!(kinds, vec![AspectKind::Sextile, AspectKind::Square, AspectKind::Trine]);
    for pair in windows.windows(2) {
        assert!(pair[0].window_end <= pair[1].window_start);
    }
    // the sextile was already active at the start and is traced back to 55 degrees
    assert!(windows[0].window_start < epoch());
    assert!((days_between(epoch(), windows[0].window_start) + 5.0 / 30.0).abs() <= PRECISION);
}
