use dyngrad::{
    DynamicGradient, FixedClock, GradientKind, GradientOptions, RasterSurface, ScheduleEntry,
    Stage, Surface as _, TimeOfDay,
};

const MINUTE_MS: u64 = 60_000;

fn at(s: &str) -> TimeOfDay {
    s.parse().unwrap()
}

fn day() -> Vec<ScheduleEntry> {
    vec![
        ScheduleEntry::new("18:00", &["#ff7e5f", "#feb47b"]),
        ScheduleEntry::new("6:00", &["#83a4d4", "#b6fbff"]),
    ]
}

fn init(
    clock: &FixedClock,
    schedule: Vec<ScheduleEntry>,
) -> (Stage, RasterSurface, DynamicGradient<RasterSurface, FixedClock>) {
    let mut stage = Stage::new();
    let surface = stage.add("sky");
    let options = GradientOptions {
        schedule,
        ..GradientOptions::default()
    };
    let g = DynamicGradient::init_in(&stage, "#sky", options, clock.clone()).unwrap();
    (stage, surface, g)
}

fn first_color(g: &DynamicGradient<RasterSurface, FixedClock>) -> String {
    g.current().colors()[0].as_str().to_string()
}

#[test]
fn init_applies_the_active_entry_and_starts_polling() {
    let clock = FixedClock::new(at("07:30"));
    let (_stage, _surface, g) = init(&clock, day());
    assert_eq!(first_color(&g), "#83a4d4");
    assert!(g.transition_in_flight());
    assert_eq!(g.pending_intervals(), 1);

    let times: Vec<&str> = g.schedule_entries().iter().map(|e| e.time.as_str()).collect();
    assert_eq!(times, ["06:00", "18:00"]);
}

#[test]
fn polling_applies_each_entry_once() {
    let clock = FixedClock::new(at("07:30"));
    let (_stage, surface, mut g) = init(&clock, day());
    g.pump(0);
    g.pump(1500);
    assert!(!g.transition_in_flight());

    // Same entry on the next tick: nothing to do.
    g.pump(MINUTE_MS);
    assert!(!g.transition_in_flight());
    assert_eq!(surface.layer_count(), 0);

    clock.set(at("18:01"));
    g.pump(2 * MINUTE_MS);
    assert_eq!(first_color(&g), "#ff7e5f");
    assert!(g.transition_in_flight());

    g.pump(2 * MINUTE_MS + 1500);
    g.pump(3 * MINUTE_MS);
    assert!(!g.transition_in_flight());
    assert_eq!(surface.background().as_ref(), Some(g.current()));
}

#[test]
fn times_before_the_first_entry_wrap_to_the_last() {
    let clock = FixedClock::new(at("03:00"));
    let (_stage, _surface, g) = init(&clock, day());
    assert_eq!(first_color(&g), "#ff7e5f");
}

#[test]
fn entries_can_carry_kind_and_direction() {
    let clock = FixedClock::new(at("12:00"));
    let schedule = vec![
        ScheduleEntry::new("06:00", &["#111111", "#222222"])
            .with_kind(GradientKind::Linear)
            .with_direction("to bottom"),
        ScheduleEntry::new("20:00", &["#333333", "#444444"]).with_kind(GradientKind::Radial),
    ];
    let (_stage, _surface, mut g) = init(&clock, schedule);
    assert_eq!(
        g.current().to_css(),
        "linear-gradient(to bottom, #111111,#222222)"
    );

    clock.set(at("20:00"));
    g.check_schedule();
    assert_eq!(
        g.current().to_css(),
        "radial-gradient(circle, #333333,#444444)"
    );
}

#[test]
fn replacing_the_schedule_keeps_a_single_poll() {
    let clock = FixedClock::new(at("07:30"));
    let (_stage, _surface, mut g) = init(&clock, day());
    g.schedule(&day());
    g.schedule(&day());
    assert_eq!(g.pending_intervals(), 1);

    g.schedule(&[]);
    assert_eq!(g.pending_intervals(), 0);
    assert!(g.schedule_entries().is_empty());
}

#[test]
fn rescheduling_reapplies_the_active_entry_after_a_manual_change() {
    let clock = FixedClock::new(at("07:30"));
    let (_stage, _surface, mut g) = init(&clock, day());
    g.set_gradient(dyngrad::GradientUpdate::colors(&["#000000", "#ffffff"]));
    assert_eq!(first_color(&g), "#000000");

    // The poll alone would not override the manual colors.
    g.pump(MINUTE_MS);
    assert_eq!(first_color(&g), "#000000");

    g.schedule(&day());
    assert_eq!(first_color(&g), "#83a4d4");
}

#[test]
fn unreadable_times_are_dropped() {
    let clock = FixedClock::new(at("07:30"));
    let schedule = vec![
        ScheduleEntry::new("breakfast", &["#abcdef"]),
        ScheduleEntry::new("6:00", &["#83a4d4", "#b6fbff"]),
    ];
    let (_stage, _surface, g) = init(&clock, schedule);
    assert_eq!(g.schedule_entries().len(), 1);
    assert_eq!(first_color(&g), "#83a4d4");
}
