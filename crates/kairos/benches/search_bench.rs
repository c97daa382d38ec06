use chrono::{TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use kairos::ephemeris::time::datetime_to_julian_day;
use kairos::{
    AnalyticEphemeris, CelestialBody, IngressFinder, MemoizedPositions, NatalChartBuilder,
    PositionProvider, ReportConfig, RetrogradeDetector, SearchConfig, TransitReport,
};

fn bench_analytic_longitude(c: &mut Criterion) {
    let eph = AnalyticEphemeris::new();
    let jd = datetime_to_julian_day(Utc.with_ymd_and_hms(2025, 7, 10, 12, 0, 0).unwrap());

    c.bench_function("analytic_longitude_uranus", |b| {
        b.iter(|| eph.apparent_longitude(CelestialBody::Uranus, black_box(jd)))
    });
}

fn bench_retrograde_scan(c: &mut Criterion) {
    let provider = PositionProvider::new(AnalyticEphemeris::new());
    let from = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();

    c.bench_function("mercury_retrogrades_year", |b| {
        b.iter(|| {
            let memo = MemoizedPositions::new(&provider);
            RetrogradeDetector::new(&memo, SearchConfig::default())
                .find_retrograde_intervals(CelestialBody::Mercury, from, 365.0, 2.0, None)
                .unwrap()
        })
    });

    c.bench_function("uranus_ingresses_year", |b| {
        b.iter(|| {
            IngressFinder::new(&provider, SearchConfig::default())
                .find_ingresses(CelestialBody::Uranus, from, 365.0, 1.0)
                .unwrap()
        })
    });
}

fn bench_full_report(c: &mut Criterion) {
    let provider = PositionProvider::new(AnalyticEphemeris::new());
    let birth = Utc.with_ymd_and_hms(1990, 5, 15, 12, 0, 0).unwrap();
    let chart = NatalChartBuilder::new(&provider)
        .build(birth, 40.7128, -74.0060)
        .unwrap();
    let now = Utc.with_ymd_and_hms(2025, 7, 10, 12, 0, 0).unwrap();
    let report = TransitReport::new(&provider, &chart, ReportConfig::default());

    let mut group = c.benchmark_group("report");
    group.sample_size(10);
    group.bench_function("outer_planets_year", |b| {
        b.iter(|| report.build_report(&CelestialBody::OUTER, now, black_box(365.0)))
    });
    group.finish();
}

criterion_group!(benches, bench_analytic_longitude, bench_retrograde_scan, bench_full_report);
criterion_main!(benches);
