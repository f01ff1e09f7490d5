use super::*;
use crate::assets::decode::{ParticleSprite, SourceImage};
use crate::preprocess::{PreprocessOpts, normalize};

fn canvas_from(img: image::RgbImage) -> NormalizedCanvas {
    let h = img.height();
    let src = SourceImage::from_rgb(img).unwrap();
    normalize(
        &src,
        PreprocessOpts {
            pixel_budget: 1 << 20,
            target_height: h,
        },
    )
    .unwrap()
}

fn gradient_canvas() -> NormalizedCanvas {
    canvas_from(image::RgbImage::from_fn(32, 16, |x, y| {
        image::Rgb([(x * 7) as u8, (y * 13) as u8, 90])
    }))
}

fn black_canvas() -> NormalizedCanvas {
    canvas_from(image::RgbImage::new(32, 16))
}

fn white_square_sprites(max: u32) -> SpriteSet {
    let sprite =
        ParticleSprite::from_rgba(image::RgbaImage::from_pixel(8, 8, image::Rgba([255; 4])))
            .unwrap();
    SpriteSet::new(&sprite, 1..=max).unwrap()
}

fn still_params() -> RenderParameters {
    RenderParameters {
        z_init: 0.0,
        speed: 1.0,
        rotate_degrees: 0.0,
        particle_rotate_degrees: 0.0,
        particle_speed: 0.0,
        particle_size: 4,
        duration_secs: 1.0,
        fade_secs: 0.2,
        fps: 10,
        ..RenderParameters::default()
    }
}

fn seed(x: f64, y: f64, depth: f64, base_size: u32) -> ParticleSeed {
    ParticleSeed {
        x,
        y,
        depth,
        base_size,
    }
}

#[test]
fn render_is_byte_deterministic() {
    let canvas = gradient_canvas();
    let sprites = SpriteSet::new(&ParticleSprite::glow(16), 1..=4).unwrap();
    let particles = [seed(5.0, 5.0, 0.5, 3), seed(20.0, 9.0, 0.9, 4)];
    let params = RenderParameters {
        rotate_degrees: -5.0,
        particle_rotate_degrees: -4.0,
        particle_speed: 3.0,
        z_init: 3.0,
        ..still_params()
    };
    let synth = FrameSynthesizer {
        canvas: &canvas,
        sprites: &sprites,
        particles: &particles,
        params: &params,
    };
    for f in [0, 3, 9] {
        let a = synth.render(FrameIndex(f), true).unwrap();
        let b = synth.render(FrameIndex(f), true).unwrap();
        assert_eq!(a, b);
    }
}

#[test]
fn index_outside_clip_is_rejected() {
    let canvas = gradient_canvas();
    let sprites = white_square_sprites(4);
    let params = still_params();
    let synth = FrameSynthesizer {
        canvas: &canvas,
        sprites: &sprites,
        particles: &[],
        params: &params,
    };
    assert!(synth.render(FrameIndex(9), false).is_ok());
    let err = synth.render(FrameIndex(10), false).unwrap_err();
    assert!(matches!(
        err,
        NebulaError::InvalidFrameIndex {
            index: 10,
            total: 10
        }
    ));
}

#[test]
fn neutral_transform_at_t0_reproduces_canvas() {
    let canvas = gradient_canvas();
    let sprites = white_square_sprites(4);
    let params = still_params();
    let synth = FrameSynthesizer {
        canvas: &canvas,
        sprites: &sprites,
        particles: &[],
        params: &params,
    };
    let frame = synth.render(FrameIndex(0), false).unwrap();
    assert_eq!(frame.data.len(), canvas.image().as_raw().len());
    for (i, (got, want)) in frame.data.iter().zip(canvas.image().as_raw()).enumerate() {
        assert!(got.abs_diff(*want) <= 1, "byte {i}: {got} vs {want}");
    }
    assert_eq!(frame.time_secs, 0.0);
}

#[test]
fn zoom_grows_with_z_init_and_time() {
    let canvas = gradient_canvas();
    let sprites = white_square_sprites(4);
    let params = RenderParameters {
        z_init: 3.0,
        z_dir: 1,
        speed: 10.0,
        ..still_params()
    };
    let synth = FrameSynthesizer {
        canvas: &canvas,
        sprites: &sprites,
        particles: &[],
        params: &params,
    };
    let s0 = synth.background_transform(0.0).as_coeffs()[0];
    let s1 = synth.background_transform(1.0).as_coeffs()[0];
    assert!((s0 - 1.3).abs() < 1e-12);
    assert!((s1 - 1.32).abs() < 1e-12);
}

#[test]
fn fade_envelope_shape() {
    assert_eq!(fade_alpha(0, 450, 30), 0.0);
    assert_eq!(fade_alpha(15, 450, 30), 0.5);
    for f in 30..=419 {
        assert_eq!(fade_alpha(f, 450, 30), 1.0, "frame {f}");
    }
    assert_eq!(fade_alpha(449, 450, 30), 1.0 / 30.0);
    assert_eq!(fade_alpha(0, 10, 0), 1.0);
    assert_eq!(fade_alpha(9, 10, 0), 1.0);
}

#[test]
fn fade_blacks_out_first_frame_only_when_enabled() {
    let canvas = gradient_canvas();
    let sprites = white_square_sprites(4);
    let params = still_params();
    let synth = FrameSynthesizer {
        canvas: &canvas,
        sprites: &sprites,
        particles: &[],
        params: &params,
    };
    let faded = synth.render(FrameIndex(0), true).unwrap();
    assert!(faded.data.iter().all(|&v| v == 0));
    let plain = synth.render(FrameIndex(0), false).unwrap();
    assert!(plain.data.iter().any(|&v| v != 0));
    let interior = synth.render(FrameIndex(5), true).unwrap();
    assert_eq!(interior, synth.render(FrameIndex(5), false).unwrap());
}

#[test]
fn particle_projects_through_perspective_scale() {
    let canvas = black_canvas();
    let sprites = white_square_sprites(4);
    let params = still_params();
    let synth = FrameSynthesizer {
        canvas: &canvas,
        sprites: &sprites,
        particles: &[],
        params: &params,
    };
    let c = canvas.canvas();
    // Depth 1: unchanged position. Depth 0.5: offset from center doubles.
    assert_eq!(
        synth.project(&seed(20.0, 10.0, 1.0, 2), 0.0, c),
        Some(Projected {
            x: 20,
            y: 10,
            size: 2
        })
    );
    assert_eq!(
        synth.project(&seed(20.0, 10.0, 0.5, 2), 0.0, c),
        Some(Projected {
            x: 24,
            y: 12,
            size: 2
        })
    );
    // Pushed off-canvas by the perspective scale.
    assert_eq!(synth.project(&seed(31.0, 1.0, 0.2, 2), 0.0, c), None);
}

#[test]
fn opaque_sprite_stamps_its_region() {
    let canvas = black_canvas();
    let sprites = white_square_sprites(4);
    let params = still_params();
    let particles = [seed(10.0, 8.0, 1.0, 3)];
    let synth = FrameSynthesizer {
        canvas: &canvas,
        sprites: &sprites,
        particles: &particles,
        params: &params,
    };
    let frame = synth.render(FrameIndex(0), false).unwrap().to_image().unwrap();
    for (x, y) in [(9, 7), (10, 8), (11, 9)] {
        assert!(frame.get_pixel(x, y).0.iter().all(|&v| v >= 254), "({x},{y})");
    }
    assert_eq!(frame.get_pixel(12, 8).0, [0, 0, 0]);
    assert_eq!(frame.get_pixel(8, 8).0, [0, 0, 0]);
}

#[test]
fn invisible_seed_leaves_frame_untouched() {
    let canvas = gradient_canvas();
    let sprites = white_square_sprites(4);
    let params = RenderParameters {
        particle_dir: 1,
        particle_speed: 100.0,
        ..still_params()
    };
    // Depth evolves as depth - t: 1.9 stays inside (0.05, 2) for the whole clip.
    let visible = seed(6.0, 6.0, 1.9, 3);
    // Depth 0.5 is visible at t=0 but has evolved to 0.5 - 0.9 < 0.05 by frame 9.
    let fading = seed(20.0, 9.0, 0.5, 4);
    // Too close from the start.
    let too_close = seed(16.0, 8.0, 0.02, 4);

    let with = [visible, fading, too_close];
    let without = [visible];
    let render = |particles: &[ParticleSeed], f: u64| {
        FrameSynthesizer {
            canvas: &canvas,
            sprites: &sprites,
            particles,
            params: &params,
        }
        .render(FrameIndex(f), false)
        .unwrap()
    };

    assert_eq!(render(&with, 9), render(&without, 9));
    assert_ne!(render(&with, 0), render(&without, 0));
}

#[test]
fn collapsed_zoom_renders_black() {
    let canvas = gradient_canvas();
    let sprites = white_square_sprites(4);
    let params = RenderParameters {
        z_init: -10.0,
        ..still_params()
    };
    let synth = FrameSynthesizer {
        canvas: &canvas,
        sprites: &sprites,
        particles: &[],
        params: &params,
    };
    assert!(synth.background_transform(0.0).determinant().abs() < 1e-12);
    let frame = synth.render(FrameIndex(0), false).unwrap();
    assert!(frame.data.iter().all(|&v| v == 0));
}
