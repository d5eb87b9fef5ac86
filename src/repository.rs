//! Repository compilation: version discovery, source loading and serialisation.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::str::{self, FromStr};

use flate2::read::GzDecoder;
use tracing::{info, trace};

use crate::cursor::Cursor;
use crate::synthesis::synthesize;
use crate::tzdb::{LeapLine, SourceParser, TzSource};
use crate::Error;

/// Magic bytes opening a repository file
const MAGIC: &[u8; 6] = b"tzrepo";
/// Stem of archive and directory names
const TZDATA: &str = "tzdata";
/// Archive extension
const TAR_GZ_EXTENSION: &str = ".tar.gz";

/// Source files consumed by the compiler; everything else in a release is ignored
const FILES_ACCEPTED: [&str; 11] = [
    "africa",
    "antarctica",
    "asia",
    "australasia",
    "backward",
    "etcetera",
    "europe",
    "leapseconds",
    "leap-seconds.list", // only for the expiry date
    "northamerica",
    "southamerica",
];

/// Version designation of a tz release, for example `2023b`.
///
/// Versions order chronologically: first by year, then by release letter.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub struct Version {
    /// 4-digit year
    year: u16,
    /// Release letter in `a..z`
    letter: u8,
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        let bytes = s.as_bytes();
        if bytes.len() != 5
            || !bytes[..4].iter().all(u8::is_ascii_digit)
            || !bytes[4].is_ascii_lowercase()
        {
            return Err(Error::Version(s.to_string()));
        }

        Ok(Self { year: s[..4].parse()?, letter: bytes[4] })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:04}{}", self.year, self.letter as char)
    }
}

/// Compiler translating tz database sources into a binary repository.
///
/// The working directory holds releases either as `tzdata<version>.tar.gz`
/// archives or as unpacked `tzdata<version>` subdirectories; the compiled
/// repository is written next to the sources of its release.
#[derive(Debug)]
pub struct Compiler {
    /// Directory holding the tz releases
    workdir: PathBuf,
    /// Keep local-mean-time eras during compilation
    lmt: bool,
}

impl Compiler {
    /// Construct a compiler working on the provided directory.
    ///
    /// With `lmt` set, leading local-mean-time eras are compiled in instead
    /// of being elided. Such eras are an invention giving the mean solar
    /// time of the archetypical city of a zone, which is usually wrong
    /// anywhere else.
    pub fn new(workdir: impl Into<PathBuf>, lmt: bool) -> Result<Self, Error> {
        let workdir = workdir.into();
        if !workdir.is_dir() {
            return Err(Error::NotFound(format!(
                "work directory does not exist: {}",
                workdir.display()
            )));
        }

        Ok(Self { workdir, lmt })
    }

    /// Returns the working directory
    pub fn working_directory(&self) -> &Path {
        &self.workdir
    }

    /// Unpack the newest archive into a subdirectory
    pub fn unpack(&self) -> Result<Version, Error> {
        match self.newest_archive_version()? {
            Some(version) => {
                self.unpack_version(version)?;
                Ok(version)
            }
            None => {
                Err(Error::NotFound(format!("archive not found in: {}", self.workdir.display())))
            }
        }
    }

    /// Unpack the archive of the given version into a subdirectory
    pub fn unpack_version(&self, version: Version) -> Result<(), Error> {
        let archive = self.workdir.join(format!("{}{}{}", TZDATA, version, TAR_GZ_EXTENSION));
        if !archive.is_file() {
            return Err(Error::NotFound(format!("archive not found: {}", archive.display())));
        }

        let subdir = self.workdir.join(format!("{}{}", TZDATA, version));
        if !subdir.is_dir() {
            fs::create_dir(&subdir)?;
        }

        info!("start unpacking of version {}", version);

        for (name, text) in load_archive(&archive)? {
            trace!("unpacking {}", name);
            fs::write(subdir.join(name), text)?;
        }

        Ok(())
    }

    /// Compile the newest available version.
    ///
    /// The newest release wins regardless of its form; an unpacked
    /// subdirectory wins a tie against an archive of the same version.
    pub fn compile(&self) -> Result<Version, Error> {
        let archive = self.newest_archive_version()?;
        let directory = self.newest_directory_version()?;

        let (version, is_directory) = match (archive, directory) {
            (None, None) => {
                return Err(Error::NotFound(format!(
                    "time zone data not found in: {}",
                    self.workdir.display()
                )))
            }
            (Some(archive), None) => (archive, false),
            (None, Some(directory)) => (directory, true),
            (Some(archive), Some(directory)) => {
                if archive > directory {
                    (archive, false)
                } else {
                    (directory, true)
                }
            }
        };

        let name = if is_directory {
            format!("{}{}", TZDATA, version)
        } else {
            format!("{}{}{}", TZDATA, version, TAR_GZ_EXTENSION)
        };
        self.compile_path(&self.workdir.join(name), version, is_directory)?;
        Ok(version)
    }

    /// Compile the given version, preferring a subdirectory over an archive
    pub fn compile_version(&self, version: Version) -> Result<(), Error> {
        let subdir = self.workdir.join(format!("{}{}", TZDATA, version));
        if subdir.is_dir() {
            return self.compile_path(&subdir, version, true);
        }

        let archive = self.workdir.join(format!("{}{}{}", TZDATA, version, TAR_GZ_EXTENSION));
        if !archive.is_file() {
            return Err(Error::NotFound(format!(
                "time zone data not found: {}",
                archive.display()
            )));
        }
        self.compile_path(&archive, version, false)
    }

    fn compile_path(&self, path: &Path, version: Version, is_directory: bool) -> Result<(), Error> {
        info!("start compiling of version {}", version);

        let contents =
            if is_directory { load_directory(path)? } else { load_archive(path)? };

        let mut parser = SourceParser::new();
        for name in FILES_ACCEPTED {
            if let Some(text) = contents.get(name) {
                trace!("parsing content of {}", name);
                parser.feed(name, text)?;
            }
        }
        let source = parser.finish();

        // Synthesise every zone before touching the output file, so that a
        // validation failure leaves no partial repository behind.
        let mut blobs = Vec::with_capacity(source.zones.len());
        for (zone_id, eras) in &source.zones {
            let history = synthesize(zone_id, eras, &source.rules, self.lmt)?;
            blobs.push((zone_id.as_str(), history.to_bytes()?));
        }
        let aliases = resolve_links(&source)?;

        trace!(
            "parsed {} zones, {} links and {} leap seconds",
            source.zones.len(),
            source.links.len(),
            source.leaps.len()
        );

        let subdir = self.workdir.join(format!("{}{}", TZDATA, version));
        if !subdir.is_dir() {
            fs::create_dir(&subdir)?;
        }

        let mut file = File::create(subdir.join(format!("{}.repository", TZDATA)))?;
        write_repository(
            &mut file,
            &version.to_string(),
            &blobs,
            &aliases,
            &source.leaps,
            source.expiry,
        )
    }

    fn newest_archive_version(&self) -> Result<Option<Version>, Error> {
        let mut newest: Option<Version> = None;

        for entry in fs::read_dir(&self.workdir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }

            let name = entry.file_name();
            let stem = match name.to_str() {
                Some(name) => name
                    .strip_prefix(TZDATA)
                    .and_then(|rest| rest.strip_suffix(TAR_GZ_EXTENSION)),
                None => None,
            };

            if let Some(version) = stem.and_then(|stem| stem.parse::<Version>().ok()) {
                if newest.map_or(true, |newest| version > newest) {
                    newest = Some(version);
                }
            }
        }

        Ok(newest)
    }

    fn newest_directory_version(&self) -> Result<Option<Version>, Error> {
        let mut newest: Option<Version> = None;

        for entry in fs::read_dir(&self.workdir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }

            let name = entry.file_name();
            let stem = match name.to_str() {
                Some(name) => name.strip_prefix(TZDATA),
                None => None,
            };

            if let Some(version) = stem.and_then(|stem| stem.parse::<Version>().ok()) {
                if newest.map_or(true, |newest| version > newest) {
                    newest = Some(version);
                }
            }
        }

        Ok(newest)
    }
}

/// Resolve the link table to indices into the sorted zone-ID list.
///
/// Aliases may chain; resolution follows the chain until a canonical zone is
/// reached. The returned table is sorted by alias.
fn resolve_links(source: &TzSource) -> Result<Vec<(String, u16)>, Error> {
    let zone_ids: Vec<&String> = source.zones.keys().collect();

    let mut aliases: HashMap<&str, &str> = HashMap::new();
    for link in &source.links {
        aliases.insert(link.alias(), link.target());
    }

    let mut resolved = BTreeMap::new();
    for alias in aliases.keys() {
        let mut key: &str = alias;
        let mut hops = 0;

        while let Some(target) = aliases.get(key) {
            key = target;
            hops += 1;
            // A chain longer than the table is cyclic
            if hops > aliases.len() {
                return Err(Error::LinkTarget(alias.to_string()));
            }
        }

        let index = zone_ids
            .binary_search_by(|zone_id| zone_id.as_str().cmp(key))
            .map_err(|_| Error::LinkTarget(alias.to_string()))?;
        resolved.insert(alias.to_string(), u16::try_from(index)?);
    }

    Ok(resolved.into_iter().collect())
}

/// Write the self-describing repository container.
///
/// All integers are big-endian; strings are a 16-bit byte count followed by
/// UTF-8 bytes.
fn write_repository(
    out: &mut impl Write,
    version: &str,
    blobs: &[(&str, Vec<u8>)],
    aliases: &[(String, u16)],
    leaps: &[LeapLine],
    expiry: (i32, u8, u8),
) -> Result<(), Error> {
    out.write_all(MAGIC)?;
    write_utf(out, version)?;

    let zone_count = u32::try_from(blobs.len())?;
    out.write_all(&zone_count.to_be_bytes())?;
    for (zone_id, blob) in blobs {
        write_utf(out, zone_id)?;
        let length = u32::try_from(blob.len())?;
        out.write_all(&length.to_be_bytes())?;
        out.write_all(blob)?;
    }

    let alias_count = u16::try_from(aliases.len())?;
    out.write_all(&alias_count.to_be_bytes())?;
    for (alias, index) in aliases {
        write_utf(out, alias)?;
        out.write_all(&index.to_be_bytes())?;
    }

    let leap_count = u16::try_from(leaps.len())?;
    out.write_all(&leap_count.to_be_bytes())?;
    for leap in leaps {
        out.write_all(&u16::try_from(leap.year())?.to_be_bytes())?;
        out.write_all(&[leap.month(), leap.day(), leap.shift() as u8])?;
    }

    out.write_all(&u16::try_from(expiry.0)?.to_be_bytes())?;
    out.write_all(&[expiry.1, expiry.2])?;
    Ok(())
}

fn write_utf(out: &mut impl Write, s: &str) -> Result<(), Error> {
    let length = u16::try_from(s.len())?;
    out.write_all(&length.to_be_bytes())?;
    out.write_all(s.as_bytes())?;
    Ok(())
}

/// Load all regular files of a gzipped tar archive as UTF-8 text
fn load_archive(archive: &Path) -> Result<HashMap<String, String>, Error> {
    let mut bytes = Vec::new();
    GzDecoder::new(File::open(archive)?).read_to_end(&mut bytes)?;

    let mut contents = HashMap::new();
    let mut cursor = Cursor::new(&bytes);
    while let Some((name, data)) = read_tar_entry(&mut cursor)? {
        let text = str::from_utf8(data)?.to_string();
        contents.insert(name, text);
    }

    Ok(contents)
}

/// Load the accepted source files of an unpacked release directory
fn load_directory(directory: &Path) -> Result<HashMap<String, String>, Error> {
    let mut contents = HashMap::new();

    for entry in fs::read_dir(directory)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }

        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(_) => continue,
        };
        // The directory also holds previously compiled output; only the
        // accepted sources are text.
        if !FILES_ACCEPTED.contains(&name.as_str()) {
            continue;
        }

        contents.insert(name, fs::read_to_string(entry.path())?);
    }

    Ok(contents)
}

/// Read one tar entry, returning `None` at the end-of-archive marker.
///
/// Entry data is padded to 512-byte blocks; sizes are octal. Only regular
/// files are returned, other entry types are skipped.
fn read_tar_entry<'a>(cursor: &mut Cursor<'a>) -> Result<Option<(String, &'a [u8])>, Error> {
    loop {
        if cursor.is_empty() {
            return Ok(None);
        }

        let header = cursor.read_exact(512)?;
        if header.iter().all(|&byte| byte == 0) {
            return Ok(None);
        }

        let name = str::from_utf8(trim_nul(&header[0..100]))?;
        let size = parse_octal(&header[124..136])?;
        let type_flag = header[156];

        let padded = size
            .checked_add(511)
            .ok_or(Error::Archive("entry size out of range"))?
            / 512
            * 512;
        let data = cursor.read_exact(padded)?;

        if matches!(type_flag, b'0' | 0) {
            let name = name.trim_start_matches("./").to_string();
            return Ok(Some((name, &data[..size])));
        }
    }
}

fn trim_nul(bytes: &[u8]) -> &[u8] {
    match bytes.iter().position(|&byte| byte == 0) {
        Some(position) => &bytes[..position],
        None => bytes,
    }
}

fn parse_octal(bytes: &[u8]) -> Result<usize, Error> {
    let text = str::from_utf8(bytes)?;
    let text = text.trim_matches(|c: char| c == '\0' || c == ' ');
    usize::from_str_radix(text, 8).map_err(Error::ParseInt)
}
