use motorlab_hardware::{SimParams, SimulatedKit};
use motorlab_traits::{PwmChannel, QuadratureCounter};
use rstest::rstest;

#[rstest]
#[case(60.0, 0.0, true)]
#[case(0.0, 60.0, false)]
fn kit_works_behind_trait_objects(#[case] a: f32, #[case] b: f32, #[case] forward: bool) {
    let kit = SimulatedKit::new(SimParams::default());
    let probe = kit.probe();
    let mut encoder: Box<dyn QuadratureCounter> = Box::new(kit.encoder);
    let mut ch_a: Box<dyn PwmChannel> = Box::new(kit.channel_a);
    let mut ch_b: Box<dyn PwmChannel> = Box::new(kit.channel_b);

    ch_a.set_duty_percent(a).unwrap();
    ch_b.set_duty_percent(b).unwrap();
    for _ in 0..5 {
        encoder.count().unwrap();
    }

    assert_eq!(probe.duties(), (a, b));
    assert_eq!(probe.position() > 0.0, forward);
}

#[test]
fn velocity_approaches_commanded_speed() {
    let params = SimParams {
        counts_per_tick_full: 100.0,
        response: 0.5,
        ..SimParams::default()
    };
    let mut kit = SimulatedKit::new(params);
    let probe = kit.probe();
    kit.channel_a.set_duty_percent(100.0).unwrap();

    let mut last = 0.0;
    let mut step = 0.0;
    for _ in 0..30 {
        kit.encoder.count().unwrap();
        step = probe.position() - last;
        last = probe.position();
    }
    assert!((step - 100.0).abs() < 0.5, "steady-state step {step}");
}
