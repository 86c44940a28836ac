//! Full-resolution output through the kitty graphics protocol. The surface is
//! sent as raw RGBA and scaled by the terminal onto the image rows; the HUD is
//! regular text underneath.

use crate::render::{Frame, Renderer, draw_overlay_popup};
use anyhow::{Context, anyhow};
use base64::Engine;
use nix::fcntl::OFlag;
use nix::sys::mman::{MapFlags, ProtFlags, mmap, munmap, shm_open, shm_unlink};
use nix::sys::stat::Mode;
use nix::unistd::ftruncate;
use std::ffi::c_void;
use std::io::Write;
use std::num::NonZeroUsize;
use std::ptr::NonNull;

/// How the RGBA payload reaches the terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KittyTransport {
    /// POSIX shared memory object (`t=s`).
    Shm,
    /// Temporary file (`t=f`).
    File,
    /// Base64 chunks inline in the escape stream (`t=d`).
    Direct,
}

impl KittyTransport {
    pub fn label(self) -> &'static str {
        match self {
            Self::Shm => "shm",
            Self::File => "file",
            Self::Direct => "direct",
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "shm" | "s" | "shared" => Some(Self::Shm),
            "file" | "f" | "temp" | "tempfile" => Some(Self::File),
            "direct" | "d" => Some(Self::Direct),
            _ => None,
        }
    }

    fn medium(self) -> char {
        match self {
            Self::Shm => 's',
            Self::File => 'f',
            Self::Direct => 'd',
        }
    }
}

const IMAGE_ID: u32 = 1;
const PLACEMENT_ID: u32 = 1;
/// 3072 raw bytes encode to exactly 4096 base64 bytes, the protocol's chunk limit.
const DIRECT_CHUNK: usize = 3 * 1024;

/// Named shared-memory object, mapped for writing. Unlinked on drop.
struct ShmBuffer {
    name: String,
    mapping: Option<(NonNull<c_void>, usize)>,
}

impl ShmBuffer {
    fn new(name: String) -> Self {
        Self {
            name,
            mapping: None,
        }
    }

    fn write(&mut self, rgba: &[u8]) -> anyhow::Result<()> {
        let ptr = self.map(rgba.len())?;
        // SAFETY: the mapping is exactly `rgba.len()` bytes, writable, and
        // owned by this process.
        unsafe {
            std::ptr::copy_nonoverlapping(rgba.as_ptr(), ptr.as_ptr().cast::<u8>(), rgba.len());
        }
        Ok(())
    }

    fn map(&mut self, len: usize) -> anyhow::Result<NonNull<c_void>> {
        if let Some((ptr, mapped)) = self.mapping {
            if mapped == len {
                return Ok(ptr);
            }
        }
        self.unmap();
        let size = NonZeroUsize::new(len).ok_or_else(|| anyhow!("empty pixel buffer"))?;
        let fd = shm_open(
            self.name.as_str(),
            OFlag::O_CREAT | OFlag::O_RDWR,
            Mode::from_bits_truncate(0o600),
        )
        .with_context(|| format!("shm_open({})", self.name))?;
        ftruncate(&fd, len as i64).context("size shared memory")?;
        // SAFETY: fresh shared mapping of a descriptor we just sized to `len`.
        let ptr = unsafe {
            mmap(
                None,
                size,
                ProtFlags::PROT_READ | ProtFlags::PROT_WRITE,
                MapFlags::MAP_SHARED,
                fd,
                0,
            )
        }
        .context("map shared memory")?;
        self.mapping = Some((ptr, len));
        Ok(ptr)
    }

    fn unmap(&mut self) {
        if let Some((ptr, len)) = self.mapping.take() {
            // SAFETY: `ptr`/`len` come from the successful mmap above.
            let _ = unsafe { munmap(ptr, len) };
        }
    }
}

impl Drop for ShmBuffer {
    fn drop(&mut self) {
        self.unmap();
        let _ = shm_unlink(self.name.as_str());
    }
}

/// Image renderer for terminals speaking the kitty graphics protocol.
pub struct KittyRenderer {
    shm: ShmBuffer,
    shm_name_b64: String,
    temp_path: String,
    temp_path_b64: String,
    transports: Vec<KittyTransport>,
    active: usize,
    b64_buf: Vec<u8>,
    hidden_for_overlay: bool,
}

impl KittyRenderer {
    /// Transport order comes from `SYMCHAOS_KITTY_TRANSPORT` when set, otherwise
    /// from the detected terminal.
    pub fn new() -> Self {
        Self::with_transports(transport_chain())
    }

    pub fn with_transports(mut transports: Vec<KittyTransport>) -> Self {
        if transports.is_empty() {
            transports.push(KittyTransport::Direct);
        }
        let pid = std::process::id();
        let shm_name = format!("/symchaos{pid}");
        let temp_path = format!("/tmp/symchaos-{pid}.rgba");
        let b64 = &base64::engine::general_purpose::STANDARD;
        Self {
            shm_name_b64: b64.encode(shm_name.as_bytes()),
            shm: ShmBuffer::new(shm_name),
            temp_path_b64: b64.encode(temp_path.as_bytes()),
            temp_path,
            transports,
            active: 0,
            b64_buf: Vec::new(),
            hidden_for_overlay: false,
        }
    }

    pub fn active_transport(&self) -> KittyTransport {
        self.transports[self.active]
    }

    /// Puts the payload where the terminal will read it. Failures here are
    /// transport specific and trigger a fallback.
    fn stage(&mut self, transport: KittyTransport, rgba: &[u8]) -> anyhow::Result<()> {
        match transport {
            KittyTransport::Shm => self.shm.write(rgba),
            KittyTransport::File => std::fs::write(&self.temp_path, rgba)
                .with_context(|| format!("write {}", self.temp_path)),
            KittyTransport::Direct => Ok(()),
        }
    }

    /// Tries the active transport first, then the others in order. Only
    /// staging errors fall through; a failed write to the terminal is returned.
    fn send(&mut self, frame: &Frame<'_>, out: &mut dyn Write) -> anyhow::Result<()> {
        let n = self.transports.len();
        let mut failures = Vec::new();
        for offset in 0..n {
            let idx = (self.active + offset) % n;
            let transport = self.transports[idx];
            if let Err(err) = self.stage(transport, frame.pixels_rgba) {
                log::warn!("kitty transport {} failed: {err:#}", transport.label());
                failures.push(format!("{}: {err:#}", transport.label()));
                continue;
            }
            if idx != self.active {
                log::info!("kitty transport switched to {}", transport.label());
                self.active = idx;
            }
            let place = Placement::for_frame(frame);
            return match transport {
                KittyTransport::Direct => {
                    write_direct(out, frame.pixels_rgba, place, &mut self.b64_buf)
                }
                KittyTransport::Shm => place.write_reference(out, transport, &self.shm_name_b64),
                KittyTransport::File => {
                    place.write_reference(out, transport, &self.temp_path_b64)
                }
            };
        }
        Err(anyhow!("no kitty transport succeeded ({})", failures.join("; ")))
    }
}

impl Default for KittyRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for KittyRenderer {
    fn name(&self) -> &'static str {
        "kitty"
    }

    fn render(&mut self, frame: &Frame<'_>, out: &mut dyn Write) -> anyhow::Result<()> {
        let need = frame.pixel_width * frame.pixel_height * 4;
        if frame.term_cols == 0 || frame.visual_rows == 0 || need == 0 {
            return Ok(());
        }
        if frame.pixels_rgba.len() < need {
            return Ok(());
        }

        if frame.sync_updates {
            out.write_all(b"\x1b[?2026h")?;
        }

        if let Some(text) = frame.overlay {
            // Images sit above the text layer, so the popup needs the image gone.
            write!(out, "\x1b_Ga=d,d=I,i={IMAGE_ID}\x1b\\")?;
            clear_rows(out, frame.term_rows)?;
            write_hud(frame, out)?;
            draw_overlay_popup(out, frame.term_cols, frame.term_rows, text)?;
            self.hidden_for_overlay = true;
            return end_frame(frame, out);
        }
        if std::mem::take(&mut self.hidden_for_overlay) {
            clear_rows(out, frame.term_rows)?;
        }

        out.write_all(b"\x1b[H")?;
        self.send(frame, out)?;
        write_hud(frame, out)?;
        end_frame(frame, out)
    }

    fn cleanup(&mut self, out: &mut dyn Write) -> anyhow::Result<()> {
        write!(out, "\x1b_Ga=d,d=A\x1b\\")?;
        out.flush()?;
        Ok(())
    }
}

impl Drop for KittyRenderer {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.temp_path);
    }
}

/// Image size in pixels and the cell rectangle it is scaled onto.
#[derive(Clone, Copy)]
struct Placement {
    width: usize,
    height: usize,
    cols: u16,
    rows: u16,
}

impl Placement {
    fn for_frame(frame: &Frame<'_>) -> Self {
        Self {
            width: frame.pixel_width,
            height: frame.pixel_height,
            cols: frame.term_cols,
            rows: frame.visual_rows,
        }
    }

    fn write_header(&self, out: &mut dyn Write, medium: char, more: bool) -> std::io::Result<()> {
        write!(
            out,
            "\x1b_Ga=T,f=32,s={},v={},t={medium},i={IMAGE_ID},p={PLACEMENT_ID},c={},r={},C=1,q=2,z=-1",
            self.width, self.height, self.cols, self.rows
        )?;
        if more {
            out.write_all(b",m=1")?;
        }
        out.write_all(b";")
    }

    /// Shm and file transports only carry the base64 name of the payload.
    fn write_reference(
        &self,
        out: &mut dyn Write,
        transport: KittyTransport,
        name_b64: &str,
    ) -> anyhow::Result<()> {
        self.write_header(out, transport.medium(), false)?;
        write!(out, "{name_b64}\x1b\\")?;
        Ok(())
    }
}

fn transport_chain() -> Vec<KittyTransport> {
    if let Some(forced) = std::env::var("SYMCHAOS_KITTY_TRANSPORT")
        .ok()
        .as_deref()
        .and_then(KittyTransport::parse)
    {
        return vec![forced];
    }
    let program = std::env::var("TERM_PROGRAM")
        .unwrap_or_default()
        .to_ascii_lowercase();
    // Ghostty handles inline data best and has no shm support on every platform.
    if program.contains("ghostty") {
        vec![KittyTransport::Direct, KittyTransport::File, KittyTransport::Shm]
    } else {
        vec![KittyTransport::Shm, KittyTransport::Direct, KittyTransport::File]
    }
}

fn write_direct(
    out: &mut dyn Write,
    rgba: &[u8],
    place: Placement,
    b64_buf: &mut Vec<u8>,
) -> anyhow::Result<()> {
    let total = rgba.len().div_ceil(DIRECT_CHUNK);
    b64_buf.resize(DIRECT_CHUNK / 3 * 4, 0);
    for (i, chunk) in rgba.chunks(DIRECT_CHUNK).enumerate() {
        let more = i + 1 < total;
        let len = base64::engine::general_purpose::STANDARD
            .encode_slice(chunk, &mut b64_buf[..])
            .context("base64 encode pixels")?;
        match (i, more) {
            (0, _) => place.write_header(out, 'd', more)?,
            (_, true) => out.write_all(b"\x1b_Gm=1;")?,
            (_, false) => out.write_all(b"\x1b_Gm=0;")?,
        }
        out.write_all(&b64_buf[..len])?;
        out.write_all(b"\x1b\\")?;
    }
    Ok(())
}

fn write_hud(frame: &Frame<'_>, out: &mut dyn Write) -> anyhow::Result<()> {
    let mut lines = frame.hud.lines();
    for i in 0..frame.hud_rows {
        write!(out, "\x1b[{};1H\x1b[0m\x1b[2K", frame.visual_rows + i + 1)?;
        if let Some(line) = lines.next() {
            let clipped: String = line.chars().take(frame.term_cols as usize).collect();
            out.write_all(clipped.as_bytes())?;
        }
    }
    Ok(())
}

fn end_frame(frame: &Frame<'_>, out: &mut dyn Write) -> anyhow::Result<()> {
    if frame.sync_updates {
        out.write_all(b"\x1b[?2026l")?;
    }
    out.flush()?;
    Ok(())
}

fn clear_rows(out: &mut dyn Write, rows: u16) -> anyhow::Result<()> {
    for row in 1..=rows {
        write!(out, "\x1b[{row};1H\x1b[0m\x1b[2K")?;
    }
    Ok(())
}
