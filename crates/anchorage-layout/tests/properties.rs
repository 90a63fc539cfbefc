//! Property tests for fitting and validation.

mod common;

use anchorage_core::{LayoutOffset, Vec3};
use anchorage_layout::{fit, AspectMode, AspectSizeFitter, LayoutScene, OperationTargetFlags};
use common::{parent_and_child, ProbeLayout};
use proptest::prelude::*;

fn mode() -> impl Strategy<Value = AspectMode> {
    prop_oneof![
        Just(AspectMode::ParentFit),
        Just(AspectMode::AnchorFit),
        Just(AspectMode::FixedWidth),
        Just(AspectMode::FixedHeight),
    ]
}

fn flags() -> impl Strategy<Value = OperationTargetFlags> {
    (1u8..16).prop_map(OperationTargetFlags::from_bits_truncate)
}

fn close(a: f32, b: f32) -> bool {
    (a - b).abs() <= 1e-3 * a.abs().max(b.abs()).max(1.0)
}

proptest! {
    #[test]
    fn fit_stays_inside_padded_base(
        w in 0.0f32..1000.0,
        h in 0.0f32..1000.0,
        pad in (0.0f32..50.0, 0.0f32..50.0, 0.0f32..50.0, 0.0f32..50.0),
        ratio in 0.01f32..10.0,
        fixed in 0.0f32..500.0,
        mode in mode(),
    ) {
        let padding = LayoutOffset::pixel(pad.0, pad.1, pad.2, pad.3);
        let (size, _) = fit(Vec3::new(w, h, 0.0), Vec3::ZERO, Vec3::ZERO, &padding, ratio, fixed, mode);

        let max_w = (w - pad.0 - pad.1).max(0.0);
        let max_h = (h - pad.2 - pad.3).max(0.0);
        prop_assert!(size.x >= 0.0 && size.y >= 0.0);
        prop_assert!(size.x <= max_w + 1e-2, "width {} exceeds {}", size.x, max_w);
        prop_assert!(size.y <= max_h + 1e-2, "height {} exceeds {}", size.y, max_h);
    }

    #[test]
    fn parent_fit_keeps_ratio_and_touches_a_side(
        w in 1.0f32..1000.0,
        h in 1.0f32..1000.0,
        ratio in 0.01f32..10.0,
    ) {
        let (size, offset) = fit(
            Vec3::new(w, h, 0.0), Vec3::ZERO, Vec3::ZERO,
            &LayoutOffset::zero(), ratio, 0.0, AspectMode::ParentFit,
        );
        prop_assert!(close(size.y, size.x * ratio));
        prop_assert!(close(size.x, w) || close(size.y, h));
        prop_assert_eq!(offset, Vec3::ZERO);
    }

    #[test]
    fn fixed_width_overrides_only_when_it_fits(
        w in 1.0f32..1000.0,
        h in 1.0f32..1000.0,
        ratio in 0.1f32..10.0,
        fixed in 0.0f32..1000.0,
    ) {
        let base = Vec3::new(w, h, 0.0);
        let padding = LayoutOffset::zero();
        let (fitted, _) = fit(base, Vec3::ZERO, Vec3::ZERO, &padding, ratio, 0.0, AspectMode::ParentFit);
        let (size, _) = fit(base, Vec3::ZERO, Vec3::ZERO, &padding, ratio, fixed, AspectMode::FixedWidth);

        if fixed <= fitted.x && fixed * ratio <= fitted.y {
            prop_assert_eq!(size.x, fixed);
            prop_assert_eq!(size.y, fixed * ratio);
        } else {
            prop_assert_eq!(size, fitted);
        }
    }

    #[test]
    fn fixed_height_overrides_only_when_it_fits(
        w in 1.0f32..1000.0,
        h in 1.0f32..1000.0,
        ratio in 0.1f32..10.0,
        fixed in 0.0f32..1000.0,
    ) {
        let base = Vec3::new(w, h, 0.0);
        let padding = LayoutOffset::zero();
        let (size, _) = fit(base, Vec3::ZERO, Vec3::ZERO, &padding, ratio, fixed, AspectMode::FixedHeight);

        let mut fitted = Vec3::new(h * ratio, h, 0.0);
        if w < fitted.x {
            fitted = Vec3::new(w, w / ratio, 0.0);
        }
        if fixed <= fitted.y && fixed * ratio <= fitted.x {
            prop_assert_eq!(size.x, fixed * ratio);
            prop_assert_eq!(size.y, fixed);
        } else {
            prop_assert!(close(size.x, fitted.x) && close(size.y, fitted.y));
        }
    }

    #[test]
    fn overlapping_operators_never_both_validate(
        a in flags(),
        b in flags(),
        pa in -100i32..100,
        pb in -100i32..100,
    ) {
        let mut scene = LayoutScene::new();
        let (_, child) = parent_and_child(&mut scene, Vec3::new(10.0, 10.0, 0.0));
        let first = scene.add_layout(child, ProbeLayout::new(a, pa)).unwrap();
        let second = scene.add_layout(child, ProbeLayout::new(b, pb)).unwrap();

        let both = scene.validate(first) && scene.validate(second);
        prop_assert_eq!(both, !a.intersects(b));
    }

    #[test]
    fn second_update_is_a_no_op(
        w in 0.0f32..1000.0,
        h in 0.0f32..1000.0,
        ratio in 0.01f32..10.0,
        fixed in 0.0f32..500.0,
        mode in mode(),
    ) {
        let mut scene = LayoutScene::new();
        let (_, child) = parent_and_child(&mut scene, Vec3::new(w, h, 0.0));
        let id = scene
            .add_layout(
                child,
                AspectSizeFitter::new(mode)
                    .with_aspect_ratio(ratio)
                    .with_fixed_length(fixed),
            )
            .unwrap();

        scene.update_layout(id).unwrap();
        let node = scene.tree().get(child).unwrap();
        let (size, offset) = (node.local_size(), node.offset());
        prop_assert!(!scene.do_changed(id).unwrap());

        scene.update_layout(id).unwrap();
        let node = scene.tree().get(child).unwrap();
        prop_assert_eq!(node.local_size(), size);
        prop_assert_eq!(node.offset(), offset);
        prop_assert!(!scene.do_changed(id).unwrap());
    }
}
