/**
 * ItemSim
 * Copyright (C) 2026 ItemSim contributors
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program. If not, see <http://www.gnu.org/licenses/>.
 */

use std::fs::File;
use std::io;
use std::io::{BufRead, BufReader, BufWriter, Lines};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

/// Opens a rating source for scanning. We expect NO headers, and a
/// whitespace-separated `user item rating` triple per line.
pub fn triple_scanner(path: &Path) -> io::Result<TripleScanner<BufReader<File>>> {
    let file = File::open(path).map_err(|error| io::Error::new(
        error.kind(),
        format!("unable to open rating source {}: {}", path.display(), error),
    ))?;

    Ok(TripleScanner { lines: BufReader::new(file).lines(), done: false })
}

/// Streaming iterator over the triples of a rating source. A line that yields
/// fewer than three tokens (or a token that is not a number) terminates the
/// scan, it is treated as end of input rather than an error.
pub struct TripleScanner<R: BufRead> {
    lines: Lines<R>,
    done: bool,
}

impl<R: BufRead> Iterator for TripleScanner<R> {

    type Item = (u32, u32, f32);

    fn next(&mut self) -> Option<(u32, u32, f32)> {
        if self.done {
            return None;
        }

        let line = match self.lines.next() {
            Some(Ok(line)) => line,
            _ => {
                self.done = true;
                return None;
            },
        };

        let mut tokens = line.split_whitespace();

        let triple = match (tokens.next(), tokens.next(), tokens.next()) {
            (Some(user), Some(item), Some(rating)) => {
                match (user.parse::<u32>(), item.parse::<u32>(), rating.parse::<f32>()) {
                    (Ok(user), Ok(item), Ok(rating)) => Some((user, item, rating)),
                    _ => None,
                }
            },
            _ => None,
        };

        if triple.is_none() {
            self.done = true;
        }

        triple
    }
}

/// Persists an identifier table: an 8-byte count followed by the external ids
/// as 4-byte integers, in internal-index order.
pub fn write_index_file(ids: &[u32], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let mut out = BufWriter::new(file);

    out.write_u64::<LittleEndian>(ids.len() as u64)?;
    for &id in ids {
        out.write_u32::<LittleEndian>(id)?;
    }

    Ok(())
}

pub fn read_index_file(path: &Path) -> io::Result<Vec<u32>> {
    let file = File::open(path).map_err(|error| io::Error::new(
        error.kind(),
        format!("unable to open index file {}: {}", path.display(), error),
    ))?;
    let mut input = BufReader::new(file);

    let count = input.read_u64::<LittleEndian>()?;
    if count == 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("empty identifier table in {}", path.display()),
        ));
    }

    let mut ids = Vec::with_capacity(count as usize);
    for _ in 0..count {
        ids.push(input.read_u32::<LittleEndian>()?);
    }

    Ok(ids)
}

/// Persists the per-item average ratings: a 4-byte count followed by one
/// 4-byte float per item, in internal-index order.
pub fn write_average_ratings(averages: &[f32], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let mut out = BufWriter::new(file);

    out.write_u32::<LittleEndian>(averages.len() as u32)?;
    for &average in averages {
        out.write_f32::<LittleEndian>(average)?;
    }

    Ok(())
}

pub fn read_average_ratings(path: &Path) -> io::Result<Vec<f32>> {
    let file = File::open(path).map_err(|error| io::Error::new(
        error.kind(),
        format!("unable to open average ratings file {}: {}", path.display(), error),
    ))?;
    let mut input = BufReader::new(file);

    let count = input.read_u32::<LittleEndian>()?;

    let mut averages = Vec::with_capacity(count as usize);
    for _ in 0..count {
        averages.push(input.read_f32::<LittleEndian>()?);
    }

    Ok(averages)
}
