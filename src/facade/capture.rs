use crate::errors::{DeskPilotError, DeskPilotResult};
use crate::facade::types::{ScreenMeta, Screenshot};

/// Captures the primary monitor. xcap is blocking, so the capture runs
/// on a blocking thread.
pub async fn capture_primary() -> DeskPilotResult<Screenshot> {
    tokio::task::spawn_blocking(capture_primary_sync)
        .await
        .map_err(|e| DeskPilotError::Facade(format!("capture join: {e}")))?
}

/// Geometry of the primary monitor without capturing pixels.
pub async fn primary_meta() -> DeskPilotResult<ScreenMeta> {
    tokio::task::spawn_blocking(|| {
        let (index, monitor) = primary_monitor()?;
        Ok(meta_for(&monitor, index))
    })
    .await
    .map_err(|e| DeskPilotError::Facade(format!("monitor join: {e}")))?
}

fn primary_monitor() -> DeskPilotResult<(u32, xcap::Monitor)> {
    let monitors = xcap::Monitor::all()
        .map_err(|e| DeskPilotError::Facade(format!("enumerate monitors: {e}")))?;
    monitors
        .into_iter()
        .enumerate()
        .find(|(_, m)| m.is_primary())
        .map(|(i, m)| (i as u32, m))
        .ok_or_else(|| DeskPilotError::Facade("no primary monitor found".into()))
}

fn meta_for(monitor: &xcap::Monitor, index: u32) -> ScreenMeta {
    let physical_width = monitor.width();
    let physical_height = monitor.height();
    let scale_factor = monitor.scale_factor() as f64;
    ScreenMeta {
        monitor_index: index,
        scale_factor,
        physical_width,
        physical_height,
        logical_width: (physical_width as f64 / scale_factor).round() as u32,
        logical_height: (physical_height as f64 / scale_factor).round() as u32,
    }
}

fn capture_primary_sync() -> DeskPilotResult<Screenshot> {
    let (index, monitor) = primary_monitor()?;
    let meta = meta_for(&monitor, index);

    let captured = monitor
        .capture_image()
        .map_err(|e| DeskPilotError::Facade(format!("capture: {e}")))?;

    // Rebuild through raw bytes so the encoder never depends on xcap's
    // image-buffer version.
    let (w, h) = (captured.width(), captured.height());
    let canvas = image::RgbaImage::from_raw(w, h, captured.into_raw())
        .ok_or_else(|| DeskPilotError::Facade("captured buffer has unexpected size".into()))?;

    let mut png_bytes = Vec::new();
    image::DynamicImage::ImageRgba8(canvas)
        .write_to(
            &mut std::io::Cursor::new(&mut png_bytes),
            image::ImageFormat::Png,
        )
        .map_err(|e| DeskPilotError::Facade(format!("PNG encode: {e}")))?;

    tracing::debug!(
        width = meta.physical_width,
        height = meta.physical_height,
        scale = meta.scale_factor,
        bytes = png_bytes.len(),
        "screen captured"
    );

    Ok(Screenshot { png_bytes, meta })
}
