use motorlab_core::mocks::{FailingChannel, SpyChannel};
use motorlab_core::{DutyPair, KitError, MotorDriver};
use motorlab_traits::{HwResult, PwmChannel};
use rstest::rstest;

fn spy_driver() -> (
    MotorDriver<SpyChannel>,
    std::rc::Rc<std::cell::RefCell<Vec<f32>>>,
    std::rc::Rc<std::cell::RefCell<Vec<f32>>>,
) {
    let a = SpyChannel::new();
    let b = SpyChannel::new();
    let (log_a, log_b) = (a.log(), b.log());
    (MotorDriver::new(a, b), log_a, log_b)
}

#[rstest]
#[case(-30.0, 0.0, 30.0)]
#[case(30.0, 30.0, 0.0)]
#[case(0.0, 0.0, 0.0)]
#[case(150.0, 100.0, 0.0)]
#[case(-250.0, 0.0, 100.0)]
#[case(100.0, 100.0, 0.0)]
fn level_splits_across_channels(#[case] level: f32, #[case] a: f32, #[case] b: f32) {
    let (mut driver, log_a, log_b) = spy_driver();
    let duty = driver.apply(level).expect("finite level");
    assert_eq!(duty, DutyPair { a, b });
    assert_eq!(log_a.borrow().last().copied(), Some(a));
    assert_eq!(log_b.borrow().last().copied(), Some(b));
    assert_eq!(driver.last(), duty);
}

#[test]
fn zero_side_is_written_before_the_driven_side() {
    let a = SpyChannel::new();
    let b = SpyChannel::new();
    let order = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));

    struct Tagged(SpyChannel, char, std::rc::Rc<std::cell::RefCell<Vec<(char, f32)>>>);
    impl PwmChannel for Tagged {
        fn set_duty_percent(&mut self, p: f32) -> HwResult<()> {
            self.2.borrow_mut().push((self.1, p));
            self.0.set_duty_percent(p)
        }
    }

    let mut driver = MotorDriver::new(
        Tagged(a, 'a', order.clone()),
        Tagged(b, 'b', order.clone()),
    );
    driver.apply(40.0).unwrap();
    driver.apply(-40.0).unwrap();
    assert_eq!(
        *order.borrow(),
        vec![('b', 0.0), ('a', 40.0), ('a', 0.0), ('b', 40.0)]
    );
}

#[rstest]
#[case(f32::NAN)]
#[case(f32::INFINITY)]
#[case(f32::NEG_INFINITY)]
fn non_finite_level_zeroes_and_errors(#[case] level: f32) {
    let (mut driver, log_a, log_b) = spy_driver();
    driver.apply(60.0).unwrap();
    let err = driver.apply(level).expect_err("non-finite level");
    assert!(matches!(
        err.downcast_ref::<KitError>(),
        Some(KitError::InvalidLevel(_))
    ));
    assert_eq!(log_a.borrow().last().copied(), Some(0.0));
    assert_eq!(log_b.borrow().last().copied(), Some(0.0));
    assert_eq!(driver.last(), DutyPair::default());
}

#[test]
fn channel_failure_surfaces_as_hardware_error() {
    let mut driver = MotorDriver::new(FailingChannel, FailingChannel);
    let err = driver.apply(25.0).expect_err("write fails");
    assert!(matches!(
        err.downcast_ref::<KitError>(),
        Some(KitError::Hardware(_))
    ));
    assert!(format!("{err:#}").contains("pwm unavailable"));
}

#[test]
fn stop_zeroes_both_channels() {
    let (mut driver, log_a, log_b) = spy_driver();
    driver.apply(-70.0).unwrap();
    driver.stop().unwrap();
    assert_eq!(log_a.borrow().last().copied(), Some(0.0));
    assert_eq!(log_b.borrow().last().copied(), Some(0.0));
    assert_eq!(driver.last(), DutyPair::default());
}
