use super::*;

fn starry_source() -> SourceImage {
    let mut img = image::RgbImage::new(96, 64);
    let mut k = 0u32;
    for y in (6..60).step_by(12) {
        for x in (6..92).step_by(12) {
            k += 1;
            img.put_pixel(x, y, image::Rgb([120 + (k % 100) as u8, 200, 255]));
        }
    }
    SourceImage::from_rgb(img).unwrap()
}

fn opts() -> EngineOpts {
    EngineOpts {
        preprocess: PreprocessOpts {
            pixel_budget: 1 << 20,
            target_height: 64,
        },
        extract: ExtractOpts {
            seed: 7,
            ..ExtractOpts::default()
        },
    }
}

fn params() -> RenderParameters {
    RenderParameters {
        particle_count: 10,
        particle_size: 4,
        duration_secs: 1.0,
        fps: 10,
        ..RenderParameters::default()
    }
}

fn engine() -> Engine {
    Engine::new(&starry_source(), ParticleSprite::glow(16), params(), opts()).unwrap()
}

#[test]
fn construction_extracts_and_activates() {
    let e = engine();
    assert_eq!(e.canvas().canvas().height, 64);
    assert_eq!(e.canvas().canvas().width, 96);
    assert!(e.seed_pool().len() >= 10);
    assert_eq!(e.snapshot().particles().len(), 10);
    assert_eq!(e.snapshot().total_frames(), 10);
}

#[test]
fn invalid_initial_parameters_abort_construction() {
    let bad = RenderParameters {
        fps: 0,
        ..params()
    };
    let err = Engine::new(&starry_source(), ParticleSprite::glow(8), bad, opts()).unwrap_err();
    assert!(matches!(err, crate::NebulaError::InvalidParameter(_)));
}

#[test]
fn motion_only_change_reuses_particles_and_sprites() {
    let mut e = engine();
    let before = e.snapshot();
    let after = e
        .apply_parameters(RenderParameters {
            speed: 4.0,
            rotate_degrees: 10.0,
            duration_secs: 2.0,
            ..params()
        })
        .unwrap();
    assert!(Arc::ptr_eq(&before.particles, &after.particles));
    assert!(Arc::ptr_eq(&before.sprites, &after.sprites));
    assert!(Arc::ptr_eq(&before.canvas, &after.canvas));
    assert_eq!(after.total_frames(), 20);
    assert_eq!(before.total_frames(), 10);
}

#[test]
fn count_change_yields_nested_subset() {
    let mut e = engine();
    let ten = e.snapshot();
    let four = e
        .apply_parameters(RenderParameters {
            particle_count: 4,
            ..params()
        })
        .unwrap();
    assert_eq!(four.particles(), &ten.particles()[..4]);
    assert!(four.sprites.len() <= 4);
}

#[test]
fn sprite_cache_holds_only_active_sizes() {
    let mut e = engine();
    let big = e
        .apply_parameters(RenderParameters {
            particle_size: crate::MAX_PARTICLE_SIZE,
            ..params()
        })
        .unwrap();
    let mut sizes: Vec<_> = big.particles().iter().map(|p| p.base_size).collect();
    sizes.sort_unstable();
    sizes.dedup();
    assert_eq!(big.sprites.len(), sizes.len());
    assert!(big.sprites.len() <= 10);
}

#[test]
fn oversized_particles_are_rejected_before_any_tile_is_built() {
    let mut e = engine();
    let before = e.snapshot();
    let err = e
        .apply_parameters(RenderParameters {
            particle_size: 2000,
            ..params()
        })
        .unwrap_err();
    assert!(matches!(err, crate::NebulaError::InvalidParameter(_)));
    assert!(Arc::ptr_eq(&before, &e.snapshot()));
}

#[test]
fn size_change_keeps_positions_and_depths() {
    let mut e = engine();
    let small = e.snapshot();
    let big = e
        .apply_parameters(RenderParameters {
            particle_size: 9,
            ..params()
        })
        .unwrap();
    assert!(!Arc::ptr_eq(&small.sprites, &big.sprites));
    for (a, b) in small.particles().iter().zip(big.particles()) {
        assert_eq!((a.x, a.y, a.depth), (b.x, b.y, b.depth));
        assert!(b.base_size >= 1 && b.base_size <= 9);
    }
}

#[test]
fn rejected_parameters_keep_current_snapshot() {
    let mut e = engine();
    let before = e.snapshot();
    let res = e.apply_parameters(RenderParameters {
        z_dir: 0,
        ..params()
    });
    assert!(res.is_err());
    assert!(Arc::ptr_eq(&before, &e.snapshot()));
}

#[test]
fn engine_frame_matches_snapshot_frame() {
    let e = engine();
    let snap = e.snapshot();
    assert_eq!(
        e.render_frame(FrameIndex(3), true).unwrap(),
        snap.render_frame(FrameIndex(3), true).unwrap()
    );
}
