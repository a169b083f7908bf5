// CLI command implementations
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use lametag::{genres, AudioFile, PatchOutcome, TagData, TagWriter};

use crate::cli::{Commands, Config, OutputFormatter, EXIT_PATCH_ABORTED};

/// Run the selected subcommand, returning the process exit code
pub fn run(config: Config) -> Result<i32> {
    let formatter = OutputFormatter::new(config.format, config.quiet);

    match config.command {
        Commands::Read {
            files,
            include_picture,
            output,
        } => command_read(&files, include_picture, output.as_deref(), &formatter),
        Commands::Write {
            file,
            metadata,
            from_file,
            cover,
            compress_over,
            unsync,
            padding,
        } => {
            let mut writer = TagWriter::new().unsynchronise(unsync).padding(padding);
            if let Some(threshold) = compress_over {
                writer = writer.compress_frames_over(threshold);
            }
            command_write(
                &file,
                metadata.as_deref(),
                from_file.as_deref(),
                cover.as_deref(),
                &writer,
                &formatter,
            )
        }
        Commands::Patch { file, frame } => command_patch(&file, &frame, &formatter),
        Commands::ExportCover { file, output } => command_export_cover(&file, &output, &formatter),
        Commands::Genres => command_genres(&formatter),
    }
}

/// Expand glob patterns; plain paths pass through unchanged
fn expand_files(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for pattern in patterns {
        if !pattern.contains(['*', '?', '[']) {
            files.push(PathBuf::from(pattern));
            continue;
        }

        let entries = glob::glob(pattern).with_context(|| format!("invalid glob pattern: {}", pattern))?;
        for entry in entries {
            let path = entry?;
            if path.is_file() {
                files.push(path);
            }
        }
    }
    Ok(files)
}

/// JSON view of a tag; picture bytes are summarised unless requested
fn tag_to_json(path: &Path, tag: &TagData, include_picture: bool) -> Result<serde_json::Value> {
    let mut value = serde_json::to_value(tag)?;
    let obj = value
        .as_object_mut()
        .context("tag did not serialize to an object")?;

    obj.insert("file".to_string(), path.display().to_string().into());
    if let Some(name) = tag.genre_name().filter(|n| Some(*n) != tag.genre.as_deref()) {
        obj.insert("genre_name".to_string(), name.into());
    }
    if !include_picture {
        if let Some(art) = &tag.album_art {
            let summary = format!(
                "<{} bytes, {}>",
                art.len(),
                lametag::AttachedPicture::detect_mime(art)
            );
            obj.insert("album_art".to_string(), summary.into());
        }
    }
    Ok(value)
}

/// Read tags from files
fn command_read(
    patterns: &[String],
    include_picture: bool,
    output: Option<&str>,
    formatter: &OutputFormatter,
) -> Result<i32> {
    let files = expand_files(patterns)?;
    if files.is_empty() {
        bail!("no files matched");
    }

    let mut writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("cannot create {}", path))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(std::io::stdout()),
    };

    let mut failures = 0;
    for path in files {
        let result = AudioFile::new(&path).and_then(|audio| audio.read_tag());
        match result {
            Ok(Some(tag)) => {
                let value = tag_to_json(&path, &tag, include_picture)?;
                formatter.output_metadata(&value, &mut *writer)?;
            }
            Ok(None) => {
                formatter.print_info(&format!("{}: no ID3v2.3 tag", path.display()));
            }
            Err(e) => {
                failures += 1;
                formatter.print_error(&format!("{}: {}", path.display(), e));
            }
        }
    }
    writer.flush()?;

    Ok(if failures > 0 { 1 } else { 0 })
}

/// Write a tag to a file, replacing the existing one
fn command_write(
    file: &str,
    metadata: Option<&str>,
    from_file: Option<&str>,
    cover: Option<&str>,
    writer: &TagWriter,
    formatter: &OutputFormatter,
) -> Result<i32> {
    let metadata_json = match (from_file, metadata) {
        (Some(path), _) => fs::read_to_string(path).with_context(|| format!("cannot read {}", path))?,
        (None, Some(json)) => json.to_string(),
        (None, None) => bail!("no tag metadata supplied"),
    };

    let mut tag: TagData = serde_json::from_str(&metadata_json).context("invalid tag JSON")?;
    if let Some(path) = cover {
        tag.album_art = Some(fs::read(path).with_context(|| format!("cannot read cover {}", path))?);
    }
    if tag.is_empty() {
        bail!("tag has no fields to write");
    }

    let audio = AudioFile::new(file).with_context(|| format!("failed to open {}", file))?;
    let tag_len = audio.write_tag(&tag, writer)?;

    if TagWriter::is_oversized(tag_len) {
        formatter.print_info(&format!("tag is {} bytes, too large to hand to an encoder", tag_len));
    }
    formatter.print_success(&format!("Wrote {} byte tag to {}", tag_len, file));
    Ok(0)
}

/// Patch the LAME tag frame in place
fn command_patch(file: &str, frame_path: &str, formatter: &OutputFormatter) -> Result<i32> {
    let frame = fs::read(frame_path).with_context(|| format!("cannot read frame {}", frame_path))?;
    let audio = AudioFile::new(file).with_context(|| format!("failed to open {}", file))?;

    match audio.patch_tag_frame(&frame)? {
        PatchOutcome::Patched { offset, length } => {
            formatter.print_success(&format!(
                "Patched {} byte tag frame at offset {} in {}",
                length, offset, file
            ));
            Ok(0)
        }
        PatchOutcome::Aborted(reason) => {
            formatter.print_error(&format!("{}: patch aborted, {}", file, reason));
            Ok(EXIT_PATCH_ABORTED)
        }
    }
}

/// Export the attached picture to a directory
fn command_export_cover(file: &str, output: &str, formatter: &OutputFormatter) -> Result<i32> {
    let audio = AudioFile::new(file).with_context(|| format!("failed to open {}", file))?;
    let Some(picture) = audio.read_picture()? else {
        formatter.print_error(&format!("{}: no attached picture", file));
        return Ok(1);
    };

    let stem = Path::new(file)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("cover");
    let dir = Path::new(output);
    fs::create_dir_all(dir).with_context(|| format!("cannot create {}", output))?;
    let target = dir.join(format!("{}.{}", stem, picture.extension()));
    fs::write(&target, &picture.image_bytes)?;

    formatter.print_success(&format!(
        "Exported {} ({}, {} bytes) to {}",
        file,
        picture.mime_type,
        picture.image_bytes.len(),
        target.display()
    ));
    Ok(0)
}

/// Print the genre table
fn command_genres(formatter: &OutputFormatter) -> Result<i32> {
    let table: serde_json::Map<String, serde_json::Value> = genres::all()
        .iter()
        .map(|(index, name)| (index.to_string(), (*name).into()))
        .collect();

    let mut stdout = std::io::stdout();
    formatter.output_metadata(&serde_json::Value::Object(table), &mut stdout)?;
    Ok(0)
}
