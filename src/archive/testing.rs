//! Zip fixtures for tests.

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;

/// Builds an in-memory zip. `None` content marks a directory entry.
pub(crate) fn zip_archive(entries: &[(&str, Option<&str>)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, content) in entries {
        match content {
            None => writer.add_directory(*name, options).unwrap(),
            Some(data) => {
                writer.start_file(*name, options).unwrap();
                writer.write_all(data.as_bytes()).unwrap();
            }
        }
    }
    writer.finish().unwrap().into_inner()
}

/// One uncompressed entry, so a byte offset maps directly into its data.
pub(crate) fn stored_archive(name: &str, content: &[u8]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    writer.start_file(name, options).unwrap();
    writer.write_all(content).unwrap();
    writer.finish().unwrap().into_inner()
}

/// The usual hosted-archive layout: everything under `<wrapper>/`.
pub(crate) fn wrapped_archive(wrapper: &str, files: &[(&str, &str)]) -> Vec<u8> {
    let dir = format!("{wrapper}/");
    let names: Vec<(String, &str)> = files
        .iter()
        .map(|(path, content)| (format!("{wrapper}/{path}"), *content))
        .collect();

    let mut entries: Vec<(&str, Option<&str>)> = vec![(dir.as_str(), None)];
    entries.extend(names.iter().map(|(name, content)| (name.as_str(), Some(*content))));
    zip_archive(&entries)
}
