use super::{TagMap, TagReader, DISC_NUMBER, TITLE, TRACK_NUMBER};
use crate::error::Error;
use lofty::config::ParseOptions;
use lofty::file::TaggedFileExt;
use lofty::prelude::Accessor;
use lofty::probe::Probe;
use lofty::tag::{ItemKey, Tag};
use std::path::Path;
use tracing::debug;

/// Reads title, track and disc from whatever tag format the container uses.
/// The primary tag wins; other tags in the file fill gaps.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoftyTagReader;

impl TagReader for LoftyTagReader {
    fn read_tags(&self, path: &Path) -> Result<TagMap, Error> {
        let tagged_file = Probe::open(path)
            .and_then(|probe| {
                probe
                    .options(ParseOptions::new().read_properties(false).read_cover_art(false))
                    .read()
            })
            .map_err(|err| Error::Tags(format!("{}: {}", path.display(), err)))?;

        let ordered: Vec<&Tag> = tagged_file
            .primary_tag()
            .into_iter()
            .chain(tagged_file.tags().iter())
            .collect();

        let mut map = TagMap::new();
        insert_first(&mut map, TITLE, &ordered, |tag| {
            tag.title().map(|title| title.to_string())
        });
        insert_first(&mut map, TRACK_NUMBER, &ordered, |tag| {
            tag.get_string(ItemKey::TrackNumber)
                .map(str::to_string)
                .or_else(|| tag.track().map(|track| track.to_string()))
        });
        insert_first(&mut map, DISC_NUMBER, &ordered, |tag| {
            tag.get_string(ItemKey::DiscNumber)
                .map(str::to_string)
                .or_else(|| tag.disk().map(|disc| disc.to_string()))
        });

        debug!("{} tags read from {}", map.len(), path.display());
        Ok(map)
    }
}

fn insert_first<F>(map: &mut TagMap, key: &str, tags: &[&Tag], extractor: F)
where
    F: Fn(&Tag) -> Option<String>,
{
    let value = tags
        .iter()
        .filter_map(|tag| extractor(*tag))
        .find(|value| !value.trim().is_empty());
    if let Some(value) = value {
        map.insert(key.to_string(), value);
    }
}
