use std::fs::File;
use std::io;
use std::path::Path;

use serde_json;

use similarity::SimilarityMeasure;

/// A pipeline request as decoded from a JSON request file, e.g.
///
/// ```json
/// {
///     "req-type": "build-index",
///     "req-id": "2432",
///     "max-threads-count": 8,
///     "ratings-file-path": "/tmp/ratings.csv",
///     "sandbox-dir": "/tmp/reco-sandbox/bkdkl"
/// }
/// ```
///
/// The core consumes it only as plain parameters: a request type, a sandbox
/// directory, a worker count, and (for index builds) a rating source path.
#[derive(Deserialize, Debug)]
pub struct PipelineRequest {
    #[serde(rename = "req-type")]
    pub req_type: RequestType,
    #[serde(rename = "req-id", default)]
    pub req_id: Option<String>,
    #[serde(rename = "sandbox-dir")]
    pub sandbox_dir: String,
    #[serde(rename = "ratings-file-path", default)]
    pub ratings_path: Option<String>,
    #[serde(rename = "max-threads-count", default = "one_thread")]
    pub num_threads: usize,
    #[serde(rename = "similarity-measure", default)]
    pub similarity_measure: Option<String>,
}

#[derive(Deserialize, Debug, PartialEq, Clone, Copy)]
pub enum RequestType {
    #[serde(rename = "build-index")]
    BuildIndex,
    #[serde(rename = "compute-similarity")]
    ComputeSimilarity,
}

fn one_thread() -> usize {
    1
}

impl PipelineRequest {

    pub fn from_file(path: &Path) -> io::Result<PipelineRequest> {
        let file = File::open(path).map_err(|error| io::Error::new(
            error.kind(),
            format!("unable to open request file {}: {}", path.display(), error),
        ))?;

        let request: PipelineRequest = serde_json::from_reader(file).map_err(|error| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("malformed request file {}: {}", path.display(), error),
            )
        })?;

        request.validate()?;

        Ok(request)
    }

    pub fn measure(&self) -> io::Result<SimilarityMeasure> {
        match self.similarity_measure {
            None => Ok(SimilarityMeasure::AdjustedCosine),
            Some(ref name) => SimilarityMeasure::from_name(name).ok_or_else(|| io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("unknown similarity measure '{}'", name),
            )),
        }
    }

    fn validate(&self) -> io::Result<()> {
        if self.req_type == RequestType::BuildIndex && self.ratings_path.is_none() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "build-index requests must name a ratings-file-path",
            ));
        }

        self.measure().map(|_| ())
    }
}

#[cfg(test)]
mod tests {

    use std::fs::File;
    use std::io::Write;

    use tempfile::TempDir;

    use similarity::SimilarityMeasure;
    use super::{PipelineRequest, RequestType};

    fn write_request(contents: &str) -> (TempDir, ::std::path::PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("request.json");
        File::create(&path).unwrap().write_all(contents.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn decodes_a_build_index_request() {
        let (_dir, path) = write_request(r#"{
            "req-type": "build-index",
            "req-id": "2432",
            "max-threads-count": 8,
            "ratings-file-path": "/tmp/ratings.csv",
            "sandbox-dir": "/tmp/reco-sandbox"
        }"#);

        let request = PipelineRequest::from_file(&path).unwrap();

        assert_eq!(request.req_type, RequestType::BuildIndex);
        assert_eq!(request.num_threads, 8);
        assert_eq!(request.ratings_path.as_ref().unwrap(), "/tmp/ratings.csv");
        assert_eq!(request.sandbox_dir, "/tmp/reco-sandbox");
    }

    #[test]
    fn thread_count_defaults_to_one() {
        let (_dir, path) = write_request(r#"{
            "req-type": "compute-similarity",
            "sandbox-dir": "/tmp/reco-sandbox"
        }"#);

        let request = PipelineRequest::from_file(&path).unwrap();

        assert_eq!(request.req_type, RequestType::ComputeSimilarity);
        assert_eq!(request.num_threads, 1);
        assert_eq!(request.measure().unwrap(), SimilarityMeasure::AdjustedCosine);
    }

    #[test]
    fn build_index_without_a_source_is_rejected() {
        let (_dir, path) = write_request(r#"{
            "req-type": "build-index",
            "sandbox-dir": "/tmp/reco-sandbox"
        }"#);

        assert!(PipelineRequest::from_file(&path).is_err());
    }

    #[test]
    fn unknown_measure_is_rejected() {
        let (_dir, path) = write_request(r#"{
            "req-type": "compute-similarity",
            "sandbox-dir": "/tmp/reco-sandbox",
            "similarity-measure": "jaccard"
        }"#);

        assert!(PipelineRequest::from_file(&path).is_err());
    }
}
