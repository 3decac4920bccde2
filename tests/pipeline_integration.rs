//! End-to-end tests for converting manifest groups against an in-memory archive
//!
//! The archive stub serves files by full remote path (prefix included) and
//! refuses everything else with a 550 reply, like the MassIVE FTP server does
//! for paths under the wrong prefix.

use base64::prelude::*;
use byteorder::{BigEndian, LittleEndian, WriteBytesExt};
use mzgroup::failure::FailureLog;
use mzgroup::pipeline::{GroupOutcome, GroupProcessor};
use mzgroup::remote::{ArchiveLayout, RemoteLocator, Transport, TransportError};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use tempfile::{tempdir, TempDir};

#[derive(Default)]
struct ArchiveStub {
    files: HashMap<String, Vec<u8>>,
}

impl ArchiveStub {
    fn serve(mut self, remote_path: &str, content: impl Into<Vec<u8>>) -> Self {
        self.files.insert(remote_path.to_string(), content.into());
        self
    }
}

impl Transport for ArchiveStub {
    fn retrieve(&mut self, remote_path: &str, sink: &mut dyn Write) -> Result<u64, TransportError> {
        match self.files.get(remote_path) {
            Some(content) => {
                sink.write_all(content)?;
                Ok(content.len() as u64)
            }
            None => Err(TransportError::PermissionDenied {
                code: 550,
                message: format!("{remote_path}: No such file or directory."),
            }),
        }
    }
}

/// Directories for one pipeline run
struct Workspace {
    work: TempDir,
    downloads: TempDir,
    pipeline: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            work: tempdir().unwrap(),
            downloads: tempdir().unwrap(),
            pipeline: tempdir().unwrap(),
        }
    }

    fn manifest(&self, name: &str, content: &str) -> std::path::PathBuf {
        let path = self.work.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn processor(&self, archive: ArchiveStub) -> GroupProcessor<ArchiveStub> {
        let locator = RemoteLocator::new(archive, ArchiveLayout::default())
            .with_download_dir(self.downloads.path());
        GroupProcessor::new(locator, FailureLog::new(self.pipeline.path(), Some("7")))
    }

    fn failure_dir(&self) -> std::path::PathBuf {
        self.pipeline.path().join("failed_logs_7")
    }

    fn downloads_are_empty(&self) -> bool {
        fs::read_dir(self.downloads.path()).unwrap().next().is_none()
    }
}

fn le_f64_base64(values: &[f64]) -> String {
    let mut buffer = Vec::new();
    for &v in values {
        buffer.write_f64::<LittleEndian>(v).unwrap();
    }
    BASE64_STANDARD.encode(buffer)
}

fn le_f32_base64(values: &[f32]) -> String {
    let mut buffer = Vec::new();
    for &v in values {
        buffer.write_f32::<LittleEndian>(v).unwrap();
    }
    BASE64_STANDARD.encode(buffer)
}

/// MS2 spectrum with peaks (100, 100) and (200, 200)
fn mzml_spectrum(index: usize, id: &str, rt_minutes: f64, mz: f64, charge: Option<i32>) -> String {
    let charge_param = charge
        .map(|z| {
            format!(r#"<cvParam cvRef="MS" accession="MS:1000041" name="charge state" value="{z}"/>"#)
        })
        .unwrap_or_default();
    format!(
        r#"      <spectrum index="{index}" id="{id}" defaultArrayLength="2">
        <cvParam cvRef="MS" accession="MS:1000511" name="ms level" value="2"/>
        <scanList count="1">
          <scan>
            <cvParam cvRef="MS" accession="MS:1000016" name="scan start time" value="{rt_minutes}" unitCvRef="UO" unitAccession="UO:0000031" unitName="minute"/>
          </scan>
        </scanList>
        <precursorList count="1">
          <precursor>
            <selectedIonList count="1">
              <selectedIon>
                <cvParam cvRef="MS" accession="MS:1000744" name="selected ion m/z" value="{mz}"/>
                {charge_param}
              </selectedIon>
            </selectedIonList>
          </precursor>
        </precursorList>
        <binaryDataArrayList count="2">
          <binaryDataArray>
            <cvParam cvRef="MS" accession="MS:1000523" name="64-bit float"/>
            <cvParam cvRef="MS" accession="MS:1000576" name="no compression"/>
            <cvParam cvRef="MS" accession="MS:1000514" name="m/z array"/>
            <binary>{mzs}</binary>
          </binaryDataArray>
          <binaryDataArray>
            <cvParam cvRef="MS" accession="MS:1000521" name="32-bit float"/>
            <cvParam cvRef="MS" accession="MS:1000576" name="no compression"/>
            <cvParam cvRef="MS" accession="MS:1000515" name="intensity array"/>
            <binary>{intensities}</binary>
          </binaryDataArray>
        </binaryDataArrayList>
      </spectrum>
"#,
        mzs = le_f64_base64(&[100.0, 200.0]),
        intensities = le_f32_base64(&[100.0, 200.0]),
    )
}

/// mzML whose native ids use the short `scan=N` form
fn short_id_mzml() -> String {
    let spectra = [
        mzml_spectrum(0, "scan=5", 2.0, 445.12, None),
        mzml_spectrum(1, "scan=7", 3.0, 300.5, Some(2)),
        mzml_spectrum(2, "scan=9", 0.5, 512.3, Some(3)),
    ];
    let mut doc = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<mzML xmlns=\"http://psi.hupo.org/ms/mzml\" version=\"1.1.0\">\n  <run id=\"run\">\n",
    );
    doc.push_str(&format!("    <spectrumList count=\"{}\">\n", spectra.len()));
    for spectrum in &spectra {
        doc.push_str(spectrum);
    }
    doc.push_str("    </spectrumList>\n  </run>\n</mzML>\n");
    doc
}

fn mzxml_document() -> String {
    let mut peaks = Vec::new();
    for v in [150.5f32, 1000.0, 250.25, 20.0] {
        peaks.write_f32::<BigEndian>(v).unwrap();
    }
    format!(
        r#"<?xml version="1.0" encoding="ISO-8859-1"?>
<mzXML xmlns="http://sashimi.sourceforge.net/schema_revision/mzXML_3.2">
  <msRun scanCount="1">
    <scan num="12" msLevel="2" peaksCount="2" retentionTime="PT61.5S">
      <precursorMz precursorIntensity="1000" precursorCharge="2">600.25</precursorMz>
      <peaks precision="32" byteOrder="network" contentType="m/z-int" compressionType="none">{}</peaks>
    </scan>
  </msRun>
  <indexOffset>0</indexOffset>
</mzXML>
"#,
        BASE64_STANDARD.encode(peaks)
    )
}

const MZML_PATH: &str = "MSV000012345/ccms_peak/a/b/file.mzML";

const MANIFEST: &str = "filename\tscan\tannotation\tcharge\n\
MSV000012345/ccms_peak/a/b/file.mzML\t5\tPEPTIDE\t2\n\
MSV000012345/ccms_peak/a/b/file.mzML\t9\tPEPTIDEK\t\n";

fn failure_row(dir: &Path, manifest: &str) -> String {
    fs::read_to_string(dir.join(format!("{manifest}.csv"))).unwrap()
}

#[test]
fn test_group_converted_with_second_template() {
    let ws = Workspace::new();
    let manifest = ws.manifest("group_file.tsv", MANIFEST);
    let archive = ArchiveStub::default().serve(&format!("z01/{MZML_PATH}"), short_id_mzml());

    let outcome = ws.processor(archive).process(&manifest).unwrap();

    let output = ws.work.path().join("group_file.tsv.mgf");
    assert_eq!(
        outcome,
        GroupOutcome::Converted {
            output: output.clone(),
            spectra: 2
        }
    );
    assert_eq!(
        fs::read_to_string(&output).unwrap(),
        "BEGIN IONS\n\
TITLE=file.mzML:scan:5\n\
PEPMASS=445.12\n\
RTINSECONDS=120.0\n\
CHARGE=2+\n\
SEQ=PEPTIDE\n\
100.00000 100.0\n\
200.00000 200.0\n\
END IONS\n\
\n\
BEGIN IONS\n\
TITLE=file.mzML:scan:9\n\
PEPMASS=512.3\n\
RTINSECONDS=30.0\n\
CHARGE=3+\n\
SEQ=PEPTIDEK\n\
100.00000 100.0\n\
200.00000 200.0\n\
END IONS\n\
\n"
    );
    assert!(!ws.failure_dir().exists());
    assert!(ws.downloads_are_empty());
}

#[test]
fn test_fallback_prefix_after_permission_denied() {
    let ws = Workspace::new();
    let manifest = ws.manifest("group_file.tsv", MANIFEST);
    let archive = ArchiveStub::default().serve(&format!("x01/{MZML_PATH}"), short_id_mzml());

    let outcome = ws.processor(archive).process(&manifest).unwrap();

    assert!(outcome.is_success());
    assert!(!ws.failure_dir().exists());
    assert!(ws.downloads_are_empty());
}

#[test]
fn test_both_prefixes_denied() {
    let ws = Workspace::new();
    let manifest = ws.manifest("group_file.tsv", MANIFEST);

    let outcome = ws.processor(ArchiveStub::default()).process(&manifest).unwrap();

    let GroupOutcome::Failed { record, log_path } = outcome else {
        panic!("expected a failure");
    };
    assert_eq!(record.filename, MZML_PATH);
    assert_eq!(record.spectra_count, 2);
    assert!(record
        .error_message
        .starts_with(&format!("Tried getting {MZML_PATH} from z01 and x01 failed. Error: 550")));
    assert_eq!(log_path, ws.failure_dir().join("group_file.tsv.csv"));
    assert_eq!(fs::read_dir(ws.failure_dir()).unwrap().count(), 1);

    let row = failure_row(&ws.failure_dir(), "group_file.tsv");
    assert!(row.starts_with(&format!("\"{MZML_PATH}\",\"Tried getting")));
    assert!(row.ends_with(",2\n"));
    assert!(ws.downloads_are_empty());
    assert!(!ws.work.path().join("group_file.tsv.mgf").exists());
}

#[test]
fn test_unmatched_scans_recorded() {
    let ws = Workspace::new();
    let manifest = ws.manifest(
        "group_file.tsv",
        &format!("filename\tscan\tannotation\n{MZML_PATH}\t5\tPEPTIDE\n{MZML_PATH}\t6\tPEPTIDE\n"),
    );
    let archive = ArchiveStub::default().serve(&format!("z01/{MZML_PATH}"), short_id_mzml());

    let outcome = ws.processor(archive).process(&manifest).unwrap();

    let GroupOutcome::Failed { record, .. } = outcome else {
        panic!("expected a failure");
    };
    assert_eq!(
        record.error_message,
        format!(
            "Tried to get scans with [controllerType=0 controllerNumber=1 scan=%d, scan=%d] \
             from {MZML_PATH} but no template matched"
        )
    );
    assert!(ws.downloads_are_empty());
}

#[test]
fn test_unsupported_file_type() {
    let ws = Workspace::new();
    let raw_path = "MSV000012345/raw/run.raw";
    let manifest = ws.manifest(
        "group_raw.tsv",
        &format!("filename\tscan\tannotation\n{raw_path}\t1\tPEPTIDE\n"),
    );
    let archive = ArchiveStub::default().serve(&format!("v01/{raw_path}"), b"\x00\x01".to_vec());

    let outcome = ws.processor(archive).process(&manifest).unwrap();

    let GroupOutcome::Failed { record, .. } = outcome else {
        panic!("expected a failure");
    };
    assert_eq!(record.filename, raw_path);
    assert_eq!(record.error_message, format!("Unsupported file type: {raw_path}"));
    assert!(ws.downloads_are_empty());
}

#[test]
fn test_unreadable_manifest() {
    let ws = Workspace::new();
    let manifest = ws.manifest("group_bad.tsv", "name\tvalue\nx\t1\n");

    let outcome = ws.processor(ArchiveStub::default()).process(&manifest).unwrap();

    let GroupOutcome::Failed { record, .. } = outcome else {
        panic!("expected a failure");
    };
    assert_eq!(record.filename, "unknown_mzml_file");
    assert_eq!(record.spectra_count, 0);
    assert!(failure_row(&ws.failure_dir(), "group_bad.tsv").ends_with(",0\n"));
}

#[test]
fn test_mzxml_group() {
    let ws = Workspace::new();
    let path = "MSV000054321/peak/run.mzXML";
    let manifest = ws.manifest(
        "group_run.tsv",
        &format!("filename\tscan\tannotation\tcharge\n{path}\t12\tSAMPLER\t3.0\n"),
    );
    let archive = ArchiveStub::default().serve(&format!("v01/{path}"), mzxml_document());

    let outcome = ws.processor(archive).process(&manifest).unwrap();
    assert!(outcome.is_success());

    let mgf = fs::read_to_string(ws.work.path().join("group_run.tsv.mgf")).unwrap();
    assert!(mgf.contains("TITLE=run.mzXML:scan:12\n"));
    assert!(mgf.contains("PEPMASS=600.25\n"));
    assert!(mgf.contains("RTINSECONDS=61.5\n"));
    assert!(mgf.contains("CHARGE=2+\n"));
    assert!(mgf.contains("150.50000 1000.0\n250.25000 20.0\n"));
    assert!(ws.downloads_are_empty());
}

#[test]
fn test_downloaded_file_removed_on_panic() {
    let ws = Workspace::new();
    let archive = ArchiveStub::default().serve(&format!("z01/{MZML_PATH}"), short_id_mzml());
    let mut locator =
        RemoteLocator::new(archive, ArchiveLayout::default()).with_download_dir(ws.downloads.path());

    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        let fetched = locator.locate_and_fetch(MZML_PATH).unwrap();
        assert!(fetched.local_path().exists());
        panic!("resolver crashed");
    }));

    assert!(result.is_err());
    assert!(ws.downloads_are_empty());
}
