use symchaos::config::RendererMode;
use symchaos::render::{
    BrailleRenderer, Frame, HalfBlockRenderer, KittyRenderer, KittyTransport, Renderer,
    draw_overlay_popup, renderer_for,
};

/// Build a solid-color RGBA pixel buffer.
fn solid_pixels(w: usize, h: usize, r: u8, g: u8, b: u8) -> Vec<u8> {
    let mut buf = vec![0u8; w * h * 4];
    for px in buf.chunks_exact_mut(4) {
        px[0] = r;
        px[1] = g;
        px[2] = b;
        px[3] = 255;
    }
    buf
}

/// Dark background with every other column lit, like a sparse attractor.
fn striped_pixels(w: usize, h: usize) -> Vec<u8> {
    let mut buf = vec![0u8; w * h * 4];
    for y in 0..h {
        for x in (0..w).step_by(2) {
            let i = (y * w + x) * 4;
            buf[i] = 250;
            buf[i + 1] = 240;
            buf[i + 2] = 138;
            buf[i + 3] = 255;
        }
    }
    buf
}

fn make_frame<'a>(
    cols: u16,
    visual_rows: u16,
    pw: usize,
    ph: usize,
    pixels: &'a [u8],
    sync: bool,
) -> Frame<'a> {
    Frame {
        term_cols: cols,
        term_rows: visual_rows + 2,
        visual_rows,
        pixel_width: pw,
        pixel_height: ph,
        pixels_rgba: pixels,
        hud: "Icon | Starfish | it 1.2M",
        hud_rows: 2,
        overlay: None,
        sync_updates: sync,
    }
}

fn render_to_string(r: &mut dyn Renderer, frame: &Frame<'_>) -> String {
    let mut out = Vec::new();
    r.render(frame, &mut out).expect("render");
    String::from_utf8_lossy(&out).into_owned()
}

// ── Half-block renderer ─────────────────────────────────────────────────────

#[test]
fn halfblock_renders_solid_frame() {
    let pixels = solid_pixels(8, 8, 30, 58, 138);
    let frame = make_frame(8, 4, 8, 8, &pixels, false);
    let s = render_to_string(&mut HalfBlockRenderer::new(), &frame);

    assert_eq!(s.matches('\u{2580}').count(), 32);
    assert!(s.contains("\x1b[38;2;30;58;138m"));
    assert!(s.contains("\x1b[48;2;30;58;138m"));
    // Color codes only change when the color changes.
    assert_eq!(s.matches("\x1b[38;2;30;58;138m").count(), 1);
    assert!(s.contains("Icon | Starfish"));
    assert!(!s.contains("\x1b[?2026h"));
}

#[test]
fn halfblock_splits_upper_and_lower_pixel() {
    let mut pixels = solid_pixels(1, 2, 0, 0, 0);
    pixels[0..3].copy_from_slice(&[255, 0, 0]);
    pixels[4..7].copy_from_slice(&[0, 0, 255]);
    let frame = make_frame(1, 1, 1, 2, &pixels, false);
    let s = render_to_string(&mut HalfBlockRenderer::new(), &frame);
    assert!(s.contains("\x1b[38;2;255;0;0m\x1b[48;2;0;0;255m\u{2580}"));
}

#[test]
fn halfblock_skips_mismatched_surface() {
    let pixels = solid_pixels(8, 6, 10, 10, 10);
    let frame = make_frame(8, 4, 8, 6, &pixels, false);
    let s = render_to_string(&mut HalfBlockRenderer::new(), &frame);
    assert!(s.is_empty());
}

#[test]
fn sync_updates_wrap_the_frame() {
    let pixels = solid_pixels(4, 4, 1, 2, 3);
    let frame = make_frame(4, 2, 4, 4, &pixels, true);
    let s = render_to_string(&mut HalfBlockRenderer::new(), &frame);
    assert!(s.starts_with("\x1b[?2026h"));
    assert!(s.ends_with("\x1b[?2026l"));
    assert!(s.contains("\x1b[?7l"), "autowrap disabled while drawing");
    assert!(s.contains("\x1b[?7h"), "autowrap restored");
}

#[test]
fn hud_lines_are_clipped_to_width() {
    let pixels = solid_pixels(6, 4, 0, 0, 0);
    let mut frame = make_frame(6, 2, 6, 4, &pixels, false);
    frame.hud = "abcdefghijkl\nsecond";
    let s = render_to_string(&mut HalfBlockRenderer::new(), &frame);
    assert!(s.contains("abcdef"));
    assert!(!s.contains("abcdefg"));
    assert!(s.contains("second"));
}

// ── Braille renderer ────────────────────────────────────────────────────────

#[test]
fn braille_solid_frame_has_no_dots() {
    let pixels = solid_pixels(8, 8, 100, 100, 100);
    let frame = make_frame(4, 2, 8, 8, &pixels, false);
    let s = render_to_string(&mut BrailleRenderer::new(), &frame);
    let dots = s
        .chars()
        .filter(|c| ('\u{2801}'..='\u{28FF}').contains(c))
        .count();
    assert_eq!(dots, 0);
    assert!(s.contains("\x1b[48;2;100;100;100m"));
}

#[test]
fn braille_lights_left_column_dots() {
    let pixels = striped_pixels(8, 8);
    let frame = make_frame(4, 2, 8, 8, &pixels, false);
    let s = render_to_string(&mut BrailleRenderer::new(), &frame);
    // Left column of a cell is dots 1, 2, 3 and 7.
    assert_eq!(s.matches('\u{2847}').count(), 8);
    assert!(s.contains("\x1b[38;2;250;240;138m"));
    assert!(s.contains("\x1b[48;2;0;0;0m"));
}

#[test]
fn braille_skips_halfblock_sized_surface() {
    let pixels = solid_pixels(4, 4, 9, 9, 9);
    let frame = make_frame(4, 2, 4, 4, &pixels, false);
    let s = render_to_string(&mut BrailleRenderer::new(), &frame);
    assert!(s.is_empty());
}

// ── Overlay ─────────────────────────────────────────────────────────────────

#[test]
fn overlay_draws_titled_box() {
    let pixels = solid_pixels(40, 20, 0, 0, 0);
    let mut frame = make_frame(40, 10, 40, 20, &pixels, false);
    frame.term_rows = 12;
    frame.overlay = Some("Keys\nspace  pause");
    let s = render_to_string(&mut HalfBlockRenderer::new(), &frame);
    assert!(s.contains("Keys"));
    assert!(s.contains("space  pause"));
    assert!(s.contains("+--"));
}

#[test]
fn overlay_is_skipped_on_tiny_terminals() {
    let mut out = Vec::new();
    draw_overlay_popup(&mut out, 6, 3, "Keys").expect("popup");
    assert!(out.is_empty());
    draw_overlay_popup(&mut out, 40, 12, "   ").expect("popup");
    assert!(out.is_empty());
}

// ── Kitty renderer ──────────────────────────────────────────────────────────

#[test]
fn kitty_direct_transmits_inline_chunks() {
    let pixels = solid_pixels(64, 32, 5, 6, 7);
    let frame = make_frame(32, 8, 64, 32, &pixels, false);
    let mut r = KittyRenderer::with_transports(vec![KittyTransport::Direct]);
    assert_eq!(r.active_transport(), KittyTransport::Direct);
    let s = render_to_string(&mut r, &frame);

    assert!(s.contains("\x1b_Ga=T,f=32,s=64,v=32,t=d"));
    assert!(s.contains("c=32,r=8"));
    // 8192 bytes of RGBA in 3072-byte chunks.
    assert_eq!(s.matches("\x1b_G").count(), 3);
    assert!(s.contains("\x1b_Gm=0;"));
    assert!(s.contains("Icon | Starfish"));

    let mut out = Vec::new();
    r.cleanup(&mut out).expect("cleanup");
    assert_eq!(out, b"\x1b_Ga=d,d=A\x1b\\");
}

#[test]
fn kitty_overlay_hides_image() {
    let pixels = solid_pixels(40, 24, 5, 6, 7);
    let mut frame = make_frame(20, 6, 40, 24, &pixels, false);
    frame.term_rows = 10;
    frame.overlay = Some("Help");
    let mut r = KittyRenderer::with_transports(vec![KittyTransport::Direct]);
    let s = render_to_string(&mut r, &frame);
    assert!(s.contains("\x1b_Ga=d,d=I,i=1"));
    assert!(!s.contains("a=T"));
    assert!(s.contains("Help"));
}

#[test]
fn kitty_transport_names_parse() {
    assert_eq!(KittyTransport::parse("SHM"), Some(KittyTransport::Shm));
    assert_eq!(KittyTransport::parse(" tempfile "), Some(KittyTransport::File));
    assert_eq!(KittyTransport::parse("d"), Some(KittyTransport::Direct));
    assert_eq!(KittyTransport::parse("pipe"), None);
    assert_eq!(KittyTransport::Direct.label(), "direct");
}

#[test]
fn renderer_for_picks_backend() {
    assert_eq!(renderer_for(RendererMode::HalfBlock).name(), "halfblock");
    assert_eq!(renderer_for(RendererMode::Braille).name(), "braille");
    assert_eq!(renderer_for(RendererMode::Kitty).name(), "kitty");
}
