use super::*;

#[test]
fn canvas_center_and_buffer_len() {
    let c = Canvas {
        width: 1440,
        height: 1080,
    };
    assert_eq!(c.center(), Point::new(720.0, 540.0));
    assert_eq!(c.rgb8_len(), 1440 * 1080 * 3);
}

#[test]
fn frame_index_orders_by_value() {
    assert!(FrameIndex(2) < FrameIndex(10));
    assert_eq!(FrameIndex(7).max(FrameIndex(3)), FrameIndex(7));
}
