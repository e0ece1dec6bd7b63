use std::fs::File;
use std::io;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

/// Dense row-major matrix of 4-byte floats with a fixed binary disk format:
/// an 8-byte row count, an 8-byte column count, then `rows * cols` values
/// with no padding. The similarity matrix and the factorization parameter
/// matrices share this codec, only their dimensions differ.
#[derive(Clone)]
pub struct Mtx {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl Mtx {

    pub fn filled(rows: usize, cols: usize, value: f32) -> Mtx {
        Mtx { rows, cols, data: vec![value; rows * cols] }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.data[row * self.cols + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: f32) {
        self.data[row * self.cols + col] = value;
    }

    pub fn row(&self, row: usize) -> &[f32] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    pub fn write(&self, path: &Path) -> io::Result<()> {
        let file = File::create(path).map_err(|error| io::Error::new(
            error.kind(),
            format!("unable to write matrix file {}: {}", path.display(), error),
        ))?;
        let mut out = BufWriter::new(file);

        out.write_u64::<LittleEndian>(self.rows as u64)?;
        out.write_u64::<LittleEndian>(self.cols as u64)?;

        for &value in &self.data {
            out.write_f32::<LittleEndian>(value)?;
        }

        Ok(())
    }

    pub fn read(path: &Path) -> io::Result<Mtx> {
        let file = File::open(path).map_err(|error| io::Error::new(
            error.kind(),
            format!("unable to open matrix file {}: {}", path.display(), error),
        ))?;
        let mut input = BufReader::new(file);

        let rows = input.read_u64::<LittleEndian>()? as usize;
        let cols = input.read_u64::<LittleEndian>()? as usize;

        if rows == 0 || cols == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("matrix file {} declares {}x{} dimensions", path.display(), rows, cols),
            ));
        }

        let mut data = Vec::with_capacity(rows * cols);
        for _ in 0..rows * cols {
            let value = input.read_f32::<LittleEndian>().map_err(|error| io::Error::new(
                error.kind(),
                format!("short read in matrix file {}: {}", path.display(), error),
            ))?;
            data.push(value);
        }

        Ok(Mtx { rows, cols, data })
    }

    /// Exact comparison, used as an integrity self-check after a write/read
    /// round trip. No epsilon tolerance: the codec must be bit-faithful.
    pub fn compare(&self, other: &Mtx) -> bool {
        self.rows == other.rows
            && self.cols == other.cols
            && self.data.iter().zip(other.data.iter()).all(|(a, b)| a.to_bits() == b.to_bits())
    }
}

#[cfg(test)]
mod tests {

    use std::fs::OpenOptions;

    use tempfile::TempDir;

    use super::Mtx;

    #[test]
    fn round_trip_preserves_every_cell() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("m_4_x_3.mtx");

        let mut mtx = Mtx::filled(4, 3, 0.0);
        for row in 0..4 {
            for col in 0..3 {
                mtx.set(row, col, (row * 3 + col) as f32 + 0.25);
            }
        }

        mtx.write(&path).unwrap();
        let reread = Mtx::read(&path).unwrap();

        assert!(mtx.compare(&reread));
        assert!(reread.compare(&mtx));
    }

    #[test]
    fn round_trip_works_for_smallest_matrix() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("m_1_x_1.mtx");

        let mtx = Mtx::filled(1, 1, ::std::f32::MIN);
        mtx.write(&path).unwrap();

        assert!(mtx.compare(&Mtx::read(&path).unwrap()));
    }

    #[test]
    fn compare_detects_differences() {
        let a = Mtx::filled(2, 2, 1.0);
        let mut b = Mtx::filled(2, 2, 1.0);

        assert!(a.compare(&b));

        b.set(1, 0, 1.0000001);
        assert!(!a.compare(&b));

        let c = Mtx::filled(2, 3, 1.0);
        assert!(!a.compare(&c));
    }

    #[test]
    fn zero_dimension_header_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("degenerate.mtx");

        let mtx = Mtx { rows: 0, cols: 5, data: Vec::new() };
        mtx.write(&path).unwrap();

        assert!(Mtx::read(&path).is_err());
    }

    #[test]
    fn truncated_payload_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("truncated.mtx");

        Mtx::filled(8, 8, 2.5).write(&path).unwrap();

        let file = OpenOptions::new().write(true).open(&path).unwrap();
        file.set_len(16 + 8 * 8 * 4 - 6).unwrap();

        assert!(Mtx::read(&path).is_err());
    }

    #[test]
    fn missing_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        assert!(Mtx::read(&dir.path().join("no-such.mtx")).is_err());
    }
}
