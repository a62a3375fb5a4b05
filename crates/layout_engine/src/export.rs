use crate::{
    constants::{EXPORT_FILE_PREFIX, EXPORT_HEADER},
    error::{LayoutError, Result},
    layout::Layout,
};
use chrono::Local;
use csv::WriterBuilder;
use std::{
    fs::File,
    io::BufWriter,
    path::{Path, PathBuf},
};

/// Writes one row per placed block to `layout_<timestamp>.csv`.
pub fn export_placements_csv(layout: &Layout, output_dir: Option<&Path>) -> Result<PathBuf> {
    let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
    let filename = format!("{EXPORT_FILE_PREFIX}_{timestamp}.csv");

    let file_path = if let Some(dir) = output_dir {
        std::fs::create_dir_all(dir).map_err(|e| LayoutError::CreateDir {
            path: dir.to_path_buf(),
            source: e,
        })?;
        dir.join(&filename)
    } else {
        filename.into()
    };

    let file = File::create(&file_path).map_err(|e| LayoutError::CreateFile {
        path: file_path.clone(),
        source: e,
    })?;

    let writer = BufWriter::new(file);
    #[allow(unused_mut)]
    let mut builder = WriterBuilder::new();
    #[cfg(windows)]
    {
        use csv::Terminator;
        builder = builder.terminator(Terminator::CRLF);
    }

    let mut wtr = builder.from_writer(writer);

    wtr.write_record(EXPORT_HEADER)?;
    let metrics = layout.metrics();
    for column in layout.columns() {
        for cell in column.cells() {
            wtr.write_record([
                column.index().to_string(),
                cell.top.to_string(),
                cell.instance.height.to_string(),
                cell.instance.colspan.to_string(),
                cell.instance.kind.clone(),
                cell.lines(metrics).to_string(),
            ])?;
        }
    }

    wtr.flush()?;
    Ok(file_path)
}
