use super::*;

use rendercycle_core::HookKind;

fn mounted_probe(
    rule: &LifecycleTestRule,
) -> (Controller<ProbeComponent>, ProbeHandle, ComponentId) {
    let (probe, handle) = ProbeComponent::new();
    let controller = rule.mount(probe).expect("mount probe");
    let id = controller.component_id().expect("probe attached");
    (controller, handle, id)
}

#[test]
fn first_update_renders_then_declined_update_does_not() {
    run_test_lifecycle(|rule| {
        let (controller, handle, id) = mounted_probe(rule);

        rule.update(&controller, "a".into());
        assert_eq!(rule.render_count(id), 1);
        assert_eq!(rule.text(id), "a:0");
        assert_eq!(handle.log().after_render_flags(), vec![true]);

        handle.decline_renders(true);
        rule.update(&controller, "b".into());
        assert_eq!(rule.render_count(id), 1);
        assert_eq!(handle.log().builds(), 1);
        assert_eq!(handle.log().on_render_flags(), vec![true, false]);
        assert_eq!(controller.component().label(), "b");
        rule.assert_no_errors();
    });
}

#[test]
fn hook_calls_arrive_in_lifecycle_order() {
    run_test_lifecycle(|rule| {
        let (controller, handle, _) = mounted_probe(rule);
        rule.update(&controller, "a".into());
        assert_eq!(
            handle.log().calls(),
            vec![
                HookCall::SetParameters("a".into()),
                HookCall::OnRender { first_render: true },
                HookCall::Build,
                HookCall::OnAfterRender { first_render: true },
            ]
        );
    });
}

#[test]
fn reset_after_several_updates_is_a_forced_first_render() {
    run_test_lifecycle(|rule| {
        let (controller, handle, id) = mounted_probe(rule);
        for label in ["a", "b", "c"] {
            rule.update(&controller, label.into());
        }
        assert_eq!(rule.render_count(id), 3);
        handle.log().clear();

        handle.decline_renders(true);
        rule.reset(&controller);
        assert_eq!(handle.log().on_render_flags(), vec![true]);
        assert_eq!(handle.log().builds(), 1);
        assert_eq!(rule.render_count(id), 4);
        // After-render's first flag belongs to the instance, not the cycle.
        assert_eq!(handle.log().after_render_flags(), vec![false]);

        rule.update(&controller, "d".into());
        assert_eq!(handle.log().on_render_flags(), vec![true, false]);
        assert_eq!(rule.render_count(id), 4);
        rule.assert_no_errors();
    });
}

#[test]
fn never_rendered_component_renders_exactly_once_when_always_declining() {
    run_test_lifecycle(|rule| {
        let (controller, handle, id) = mounted_probe(rule);
        handle.decline_renders(true);

        rule.update(&controller, "a".into());
        rule.update(&controller, "b".into());
        rule.request_render(&controller);
        assert_eq!(rule.render_count(id), 1);
        assert_eq!(rule.text(id), "a:0");
    });
}

#[test]
fn requests_before_the_render_runs_coalesce() {
    run_test_lifecycle(|rule| {
        let (controller, handle, id) = mounted_probe(rule);
        rule.update(&controller, "a".into());

        for _ in 0..5 {
            rule.renderer().spawn(controller.request_render());
        }
        rule.renderer().spawn(controller.update("b".into()));
        rule.pump_until_idle();

        assert_eq!(rule.render_count(id), 2);
        assert_eq!(handle.log().builds(), 2);
        assert_eq!(rule.text(id), "b:0");
        assert!(!controller.snapshot().pending_render);
    });
}

#[test]
fn synchronous_click_renders_once() {
    run_test_lifecycle(|rule| {
        let (controller, _handle, id) = mounted_probe(rule);
        rule.update(&controller, "a".into());

        rule.click(id).expect("click routed");
        assert_eq!(rule.render_count(id), 2);
        assert_eq!(rule.text(id), "a:1");

        rule.pump_until_idle();
        assert_eq!(rule.render_count(id), 2);
        rule.assert_no_errors();
    });
}

#[test]
fn pending_click_renders_again_when_it_completes() {
    run_test_lifecycle(|rule| {
        let (controller, handle, id) = mounted_probe(rule);
        rule.update(&controller, "a".into());

        let release = handle.gate_next_click();
        rule.click(id).expect("click routed");
        assert_eq!(rule.render_count(id), 2);

        release.send(()).expect("click still pending");
        rule.pump_until_idle();
        assert_eq!(rule.render_count(id), 3);
        rule.assert_no_errors();
    });
}

#[test]
fn cancelled_click_renders_only_immediately() {
    run_test_lifecycle(|rule| {
        let (controller, handle, id) = mounted_probe(rule);
        rule.update(&controller, "a".into());

        let release = handle.gate_next_click();
        rule.click(id).expect("click routed");
        drop(release);
        rule.pump_until_idle();

        assert_eq!(rule.render_count(id), 2);
        assert_eq!(rule.text(id), "a:1");
        rule.assert_no_errors();
    });
}

#[test]
fn failing_handler_renders_once_and_reports() {
    run_test_lifecycle(|rule| {
        let (controller, _handle, id) = mounted_probe(rule);
        rule.update(&controller, "a".into());

        rule.dispatch_event(id, "fail", EventArgs::Empty)
            .expect("handler routed");
        assert_eq!(rule.render_count(id), 2);
        let errors = rule.take_errors();
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], LifecycleError::Callback { .. }));
    });
}

#[test]
fn failing_on_render_aborts_the_cycle() {
    run_test_lifecycle(|rule| {
        let (controller, handle, id) = mounted_probe(rule);
        handle.fail_next_on_render();

        rule.update(&controller, "a".into());
        assert_eq!(rule.render_count(id), 0);
        assert!(controller.is_loading());
        let errors = rule.take_errors();
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            errors[0],
            LifecycleError::Hook {
                hook: HookKind::OnRender,
                ..
            }
        ));

        // The aborted cycle never cleared the first-render flag.
        rule.update(&controller, "b".into());
        assert_eq!(handle.log().on_render_flags(), vec![true, true]);
        assert_eq!(rule.render_count(id), 1);
        assert!(!controller.is_loading());
    });
}

#[test]
fn loading_spans_a_suspended_on_render() {
    run_test_lifecycle(|rule| {
        let (controller, handle, id) = mounted_probe(rule);
        let release = handle.gate_next_on_render();

        rule.update(&controller, "a".into());
        assert!(controller.is_loading());
        assert_eq!(rule.render_count(id), 0);

        release.send(()).expect("on_render still pending");
        rule.pump_until_idle();
        assert!(!controller.is_loading());
        assert_eq!(rule.render_count(id), 1);
        rule.assert_no_errors();
    });
}

#[test]
fn run_returns_the_entry_point_result() {
    run_test_lifecycle(|rule| {
        let (controller, _handle, id) = mounted_probe(rule);
        assert!(matches!(rule.run(controller.update("a".into())), Some(Ok(()))));
        assert_eq!(rule.render_count(id), 1);

        assert!(matches!(
            rule.click(id + 1),
            Err(HostError::UnknownComponent(_))
        ));
    });
}
