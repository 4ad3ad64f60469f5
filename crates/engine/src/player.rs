//! In-process playback pipeline.
//!
//! The engine never decodes media itself; it drives a GStreamer pipeline
//! through the [`PlayerPipeline`] seam. Plain playback uses `playbin`;
//! when a recording sink is attached the graph is rebuilt around a `tee`
//! so the stream renders to the display and muxes to an MP4 file at the
//! same time.

use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

use gst::prelude::*;
use gstreamer as gst;
use playcast_common::error::{PlaycastError, PlaycastResult};

/// How long stop waits for EOS to drain so muxers can finalize output.
const EOS_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// How long start waits for the pipeline to actually reach Playing.
const STATE_CHANGE_TIMEOUT_SECS: u64 = 10;

/// Seam between the arbiter and the in-process media stack.
pub trait PlayerPipeline: Send {
    /// Start playing `url`. With `record_sink`, also write the stream to
    /// that file (output-duplication).
    fn play(&mut self, url: &str, record_sink: Option<&Path>) -> PlaycastResult<()>;

    /// Stop and release the pipeline, finalizing any attached sink.
    fn stop(&mut self) -> PlaycastResult<()>;

    fn pause(&mut self) -> PlaycastResult<()>;

    fn resume(&mut self) -> PlaycastResult<()>;

    /// Playing and not paused.
    fn is_playing(&self) -> bool;

    /// Current position as a fraction of the duration, when known.
    fn position(&self) -> Option<f64>;

    /// Elapsed playback time, when known.
    fn elapsed(&self) -> Option<Duration>;

    /// Total stream duration, when known.
    fn duration(&self) -> Option<Duration>;

    /// Jump to a fraction of the duration.
    fn seek(&mut self, fraction: f64) -> PlaycastResult<()>;
}

/// GStreamer-backed implementation.
pub struct GstPlayer {
    pipeline: Option<gst::Pipeline>,
    paused: bool,
}

impl GstPlayer {
    pub fn new() -> Self {
        Self {
            pipeline: None,
            paused: false,
        }
    }
}

impl Default for GstPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayerPipeline for GstPlayer {
    fn play(&mut self, url: &str, record_sink: Option<&Path>) -> PlaycastResult<()> {
        self.stop()?;
        init_gstreamer()?;

        let launch = match record_sink {
            Some(sink) => build_duplication_description(url, sink),
            None => build_playback_description(url),
        };
        tracing::debug!(%launch, "Building in-process pipeline");

        let element = gst::parse::launch(&launch)
            .map_err(|e| PlaycastError::pipeline(format!("Failed to build pipeline: {e}")))?;
        let pipeline = element
            .dynamic_cast::<gst::Pipeline>()
            .map_err(|_| PlaycastError::pipeline("Launch description did not produce a pipeline"))?;

        pipeline
            .set_state(gst::State::Playing)
            .map_err(|e| PlaycastError::pipeline(format!("Failed to start playback: {e:?}")))?;

        // State changes are async; without this wait the source may not
        // have opened yet when we return.
        let wait_result = pipeline.state(gst::ClockTime::from_seconds(STATE_CHANGE_TIMEOUT_SECS));
        match wait_result {
            (Ok(_), gst::State::Playing, _) => {}
            (Ok(_), state, _) => {
                tracing::warn!(?state, "Pipeline did not reach Playing state within timeout");
            }
            (Err(e), _, _) => {
                let _ = pipeline.set_state(gst::State::Null);
                return Err(PlaycastError::pipeline(format!(
                    "Pipeline failed to reach Playing state: {e:?}"
                )));
            }
        }

        self.pipeline = Some(pipeline);
        self.paused = false;
        Ok(())
    }

    fn stop(&mut self) -> PlaycastResult<()> {
        let Some(pipeline) = self.pipeline.take() else {
            return Ok(());
        };
        self.paused = false;

        // Send EOS downstream first so an attached muxer can flush and
        // write its trailer; without this the tail of a recording may be
        // truncated.
        if pipeline.send_event(gst::event::Eos::new()) {
            drain_until_eos(&pipeline);
        } else {
            tracing::warn!("Failed to send EOS event; recording output may be truncated");
        }

        pipeline
            .set_state(gst::State::Null)
            .map_err(|e| PlaycastError::pipeline(format!("Failed to stop pipeline: {e:?}")))?;
        Ok(())
    }

    fn pause(&mut self) -> PlaycastResult<()> {
        let pipeline = self.require_pipeline()?;
        pipeline
            .set_state(gst::State::Paused)
            .map_err(|e| PlaycastError::pipeline(format!("Failed to pause: {e:?}")))?;
        self.paused = true;
        Ok(())
    }

    fn resume(&mut self) -> PlaycastResult<()> {
        let pipeline = self.require_pipeline()?;
        pipeline
            .set_state(gst::State::Playing)
            .map_err(|e| PlaycastError::pipeline(format!("Failed to resume: {e:?}")))?;
        self.paused = false;
        Ok(())
    }

    fn is_playing(&self) -> bool {
        self.pipeline.is_some() && !self.paused
    }

    fn position(&self) -> Option<f64> {
        let pipeline = self.pipeline.as_ref()?;
        let position = pipeline.query_position::<gst::ClockTime>()?;
        let duration = pipeline.query_duration::<gst::ClockTime>()?;
        if duration.nseconds() == 0 {
            return None;
        }
        Some((position.nseconds() as f64 / duration.nseconds() as f64).clamp(0.0, 1.0))
    }

    fn elapsed(&self) -> Option<Duration> {
        let pipeline = self.pipeline.as_ref()?;
        let position = pipeline.query_position::<gst::ClockTime>()?;
        Some(Duration::from_nanos(position.nseconds()))
    }

    fn duration(&self) -> Option<Duration> {
        let pipeline = self.pipeline.as_ref()?;
        let duration = pipeline.query_duration::<gst::ClockTime>()?;
        Some(Duration::from_nanos(duration.nseconds()))
    }

    fn seek(&mut self, fraction: f64) -> PlaycastResult<()> {
        let pipeline = self.require_pipeline()?;
        let duration = pipeline
            .query_duration::<gst::ClockTime>()
            .ok_or_else(|| PlaycastError::pipeline("Stream duration unknown; cannot seek"))?;
        let target_ns = (duration.nseconds() as f64 * fraction.clamp(0.0, 1.0)) as u64;
        pipeline
            .seek_simple(
                gst::SeekFlags::FLUSH | gst::SeekFlags::KEY_UNIT,
                gst::ClockTime::from_nseconds(target_ns),
            )
            .map_err(|e| PlaycastError::pipeline(format!("Seek failed: {e}")))?;
        Ok(())
    }
}

impl GstPlayer {
    fn require_pipeline(&self) -> PlaycastResult<&gst::Pipeline> {
        self.pipeline
            .as_ref()
            .ok_or_else(|| PlaycastError::state("Nothing is playing"))
    }
}

fn drain_until_eos(pipeline: &gst::Pipeline) {
    let Some(bus) = pipeline.bus() else {
        return;
    };
    let start = std::time::Instant::now();
    loop {
        let elapsed = start.elapsed();
        if elapsed >= EOS_DRAIN_TIMEOUT {
            tracing::warn!("EOS drain timed out");
            break;
        }
        let remaining = EOS_DRAIN_TIMEOUT - elapsed;
        match bus.timed_pop(gst::ClockTime::from_nseconds(remaining.as_nanos() as u64)) {
            Some(msg) => match msg.view() {
                gst::MessageView::Eos(_) => {
                    tracing::debug!("EOS received; pipeline drained");
                    break;
                }
                gst::MessageView::Error(e) => {
                    tracing::warn!(error = %e.error(), "Pipeline error during EOS drain");
                    break;
                }
                _ => {}
            },
            None => {
                tracing::warn!("EOS drain timed out");
                break;
            }
        }
    }
}

/// Plain playback: let playbin assemble decode and render.
fn build_playback_description(url: &str) -> String {
    format!("playbin uri=\"{}\"", escape_launch_value(url))
}

/// Output-duplication: render to the display and mux the same stream to
/// an MP4 file. The stream is re-encoded because the file sink needs a
/// clean elementary stream regardless of what the source carried.
fn build_duplication_description(url: &str, sink: &Path) -> String {
    let uri = escape_launch_value(url);
    let location = escape_launch_value(&sink.to_string_lossy());
    format!(
        "uridecodebin uri=\"{uri}\" name=dec \
         dec. ! queue ! videoconvert ! tee name=vsplit \
         vsplit. ! queue ! autovideosink \
         vsplit. ! queue ! x264enc tune=zerolatency speed-preset=veryfast ! h264parse ! mp4mux name=mux ! filesink location=\"{location}\" \
         dec. ! queue ! audioconvert ! tee name=asplit \
         asplit. ! queue ! autoaudiosink \
         asplit. ! queue ! audioresample ! avenc_aac ! mux."
    )
}

fn escape_launch_value(value: &str) -> String {
    value.replace('"', "\\\"")
}

fn init_gstreamer() -> PlaycastResult<()> {
    static GST_INIT: OnceLock<Result<(), String>> = OnceLock::new();
    let init_res = GST_INIT.get_or_init(|| gst::init().map_err(|e| e.to_string()));
    match init_res {
        Ok(()) => Ok(()),
        Err(e) => Err(PlaycastError::pipeline(format!(
            "Failed to initialize GStreamer: {e}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn playback_description_wraps_playbin() {
        let launch = build_playback_description("https://x/manifest.mpd");
        assert_eq!(launch, "playbin uri=\"https://x/manifest.mpd\"");
    }

    #[test]
    fn duplication_description_splits_to_display_and_file() {
        let launch = build_duplication_description(
            "https://x/manifest.mpd",
            &PathBuf::from("/tmp/out.mp4"),
        );
        assert!(launch.contains("uridecodebin uri=\"https://x/manifest.mpd\""));
        assert!(launch.contains("tee name=vsplit"));
        assert!(launch.contains("autovideosink"));
        assert!(launch.contains("mp4mux name=mux"));
        assert!(launch.contains("filesink location=\"/tmp/out.mp4\""));
        assert!(launch.contains("autoaudiosink"));
    }

    #[test]
    fn quotes_in_values_are_escaped() {
        let launch = build_playback_description("https://x/a\"b.mpd");
        assert!(launch.contains("a\\\"b"));
    }
}
