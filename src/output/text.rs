//! Human-readable report for the terminal.
//!
//! Each pair prints as a numbered block with both files side by side and
//! the winning side of each property marked with `*`. Colors come from
//! `yansi` and follow its global switch, so `--no-color` (or `NO_COLOR`)
//! yields plain text.

use std::io::{self, Write};

use yansi::Paint;

use super::{readable_bitrate, readable_size, MatchReport, ReportPair, ReportVideo};
use crate::review::{Better, PairDetails};

/// Text formatter over a finished report.
#[derive(Debug, Clone, Copy)]
pub struct TextOutput<'a> {
    report: &'a MatchReport,
}

impl<'a> TextOutput<'a> {
    /// Create a text view of a report.
    #[must_use]
    pub fn new(report: &'a MatchReport) -> Self {
        Self { report }
    }

    /// Write the pair listing, rejections and summary.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        for (number, pair) in self.report.pairs.iter().enumerate() {
            write_pair(writer, number + 1, pair)?;
        }

        if !self.report.rejections.is_empty() {
            writeln!(
                writer,
                "{}",
                format!("Rejected {} file(s):", self.report.rejections.len()).yellow()
            )?;
            for rejection in &self.report.rejections {
                writeln!(
                    writer,
                    "  [{}] {}",
                    rejection.reason.yellow(),
                    rejection.message
                )?;
            }
            writeln!(writer)?;
        }

        self.write_summary(writer)
    }

    fn write_summary<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let s = &self.report.summary;
        writeln!(writer, "{}", "Summary".bold())?;
        writeln!(
            writer,
            "  Videos:    {} of {} usable ({} rejected, {} skipped)",
            s.videos_accepted, s.files_discovered, s.videos_rejected, s.files_skipped
        )?;
        writeln!(
            writer,
            "  Matching:  {} mode, {} bit threshold",
            s.mode, s.bit_threshold
        )?;
        writeln!(writer, "  Pairs:     {}", s.pairs.to_string().green())?;
        if let (Some(videos), Some(size)) = (s.videos_with_match, s.combined_size) {
            writeln!(
                writer,
                "  Estimate:  {} video(s) with a match, {} in likely copies",
                videos,
                readable_size(size)
            )?;
        }
        if s.interrupted {
            writeln!(
                writer,
                "  {}",
                "Interrupted: results cover completed files only".red()
            )?;
        }
        Ok(())
    }
}

fn mark(better: Better, side: Better) -> &'static str {
    if better == side {
        "*"
    } else {
        " "
    }
}

fn write_pair<W: Write>(writer: &mut W, number: usize, pair: &ReportPair) -> io::Result<()> {
    let d = &pair.details;
    let mut heading = format!("#{number}  agreement {}/64", d.score.agreement);
    if let Some(ssim) = d.score.structural {
        heading.push_str(&format!(", ssim {ssim:.3}"));
    }
    if d.same_folder {
        heading.push_str(", same folder");
    }
    writeln!(writer, "{}", heading.cyan().bold())?;

    for (label, video, side) in [("L", &pair.left, Better::Left), ("R", &pair.right, Better::Right)] {
        writeln!(writer, "  {} {}", label.bold(), video.path)?;
        writeln!(writer, "    {}", describe(video, |b| mark(b, side), d))?;
    }
    writeln!(writer)
}

fn describe<F>(video: &ReportVideo, mark: F, d: &PairDetails) -> String
where
    F: Fn(Better) -> &'static str,
{
    let duration = if video.duration_display.is_empty() {
        format!("{}ms", video.duration_ms)
    } else {
        video.duration_display.clone()
    };
    format!(
        "{}{}  {}{}  {}{}x{}  {}{}  {}{:.2} fps  {}  {}modified {}",
        mark(d.size),
        video.size_display,
        mark(d.duration),
        duration,
        mark(d.resolution),
        video.width,
        video.height,
        mark(d.bitrate),
        readable_bitrate(video.bitrate_kbps),
        mark(d.framerate),
        video.framerate,
        video.codec,
        mark(d.modified),
        video.modified,
    )
}
