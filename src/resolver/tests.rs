use super::*;
use std::collections::HashMap;
use std::io::Write;

use crate::mzml::{Precursor, SelectedIon};
use crate::mzxml::MzXMLPrecursor;

fn row(filename: &str, scan: u64, annotation: &str, charge: Option<i32>) -> ManifestRow {
    ManifestRow {
        filename: filename.to_string(),
        scan,
        annotation: annotation.to_string(),
        charge,
    }
}

fn mzml_spectrum(id: &str, mz: f64, charge: Option<i32>, possible: Vec<i32>) -> MzMLSpectrum {
    MzMLSpectrum {
        id: id.to_string(),
        retention_time: Some(90.0),
        precursors: vec![Precursor {
            selected_ions: vec![SelectedIon {
                mz: Some(mz),
                charge,
                possible_charges: possible,
                ..Default::default()
            }],
            ..Default::default()
        }],
        mz_array: vec![100.0, 200.0],
        intensity_array: vec![50.0, 200.0],
        ..Default::default()
    }
}

/// In-memory lookup that fails with `NotFound` on the first unknown id
struct StubLookup<S> {
    spectra: HashMap<String, S>,
    requests: Vec<Vec<String>>,
}

impl<S> StubLookup<S> {
    fn new(spectra: Vec<(&str, S)>) -> Self {
        Self {
            spectra: spectra
                .into_iter()
                .map(|(id, s)| (id.to_string(), s))
                .collect(),
            requests: Vec::new(),
        }
    }
}

impl<S: SpectrumRecord + Clone> SpectrumLookup for StubLookup<S> {
    type Spectrum = S;

    fn get_by_ids(&mut self, ids: &[String]) -> Result<Vec<S>, LookupError> {
        self.requests.push(ids.to_vec());
        ids.iter()
            .map(|id| {
                self.spectra
                    .get(id)
                    .cloned()
                    .ok_or_else(|| LookupError::NotFound(id.clone()))
            })
            .collect()
    }
}

struct FailingLookup;

impl SpectrumLookup for FailingLookup {
    type Spectrum = MzXMLScan;

    fn get_by_ids(&mut self, _: &[String]) -> Result<Vec<MzXMLScan>, LookupError> {
        Err(LookupError::MzXML(crate::mzxml::MzXMLError::InvalidStructure(
            "truncated".to_string(),
        )))
    }
}

/// Lookup that answers every request with a single scan
struct TruncatingLookup;

impl SpectrumLookup for TruncatingLookup {
    type Spectrum = MzXMLScan;

    fn get_by_ids(&mut self, _: &[String]) -> Result<Vec<MzXMLScan>, LookupError> {
        Ok(vec![MzXMLScan {
            precursors: vec![MzXMLPrecursor {
                mz: Some(600.25),
                ..Default::default()
            }],
            ..Default::default()
        }])
    }
}

#[test]
fn test_source_format_from_path() {
    assert_eq!(SourceFormat::from_path("a/b/run.mzML"), Some(SourceFormat::MzML));
    assert_eq!(SourceFormat::from_path("run.mzXML"), Some(SourceFormat::MzXML));
    assert_eq!(SourceFormat::from_path("run.mzml"), None);
    assert_eq!(SourceFormat::from_path("run.mgf"), None);
    assert_eq!(SourceFormat::MzXML.id_templates()[0].render(7), "7");
    assert_eq!(
        SourceFormat::MzML.id_templates()[0].render(7),
        "controllerType=0 controllerNumber=1 scan=7"
    );
}

#[test]
fn test_second_template_used_in_row_order() {
    let mut lookup = StubLookup::new(vec![
        ("scan=5", mzml_spectrum("scan=5", 445.12, None, vec![])),
        ("scan=9", mzml_spectrum("scan=9", 512.3, Some(3), vec![])),
    ]);
    let rows = vec![
        row("a/b/file.mzML", 9, "PEPTIDEK", None),
        row("a/b/file.mzML", 5, "PEPTIDE", Some(2)),
    ];

    let records = resolve_with(&mut lookup, MZML_TEMPLATES, "file.mzML", &rows).unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].title, "file.mzML:scan:9");
    assert_eq!(records[0].pepmass, 512.3);
    assert_eq!(records[0].charge, Some(3));
    assert_eq!(records[0].seq, "PEPTIDEK");

    assert_eq!(records[1].title, "file.mzML:scan:5");
    assert_eq!(records[1].pepmass, 445.12);
    assert_eq!(records[1].charge, Some(2));
    assert_eq!(records[1].rt_seconds, Some(90.0));
    assert_eq!(records[1].mz_array, vec![100.0, 200.0]);

    assert_eq!(lookup.requests.len(), 2);
    assert_eq!(
        lookup.requests[0][0],
        "controllerType=0 controllerNumber=1 scan=9"
    );
    assert_eq!(lookup.requests[1], vec!["scan=9", "scan=5"]);
}

#[test]
fn test_mzml_charge_precedence() {
    let mut lookup = StubLookup::new(vec![
        ("scan=1", mzml_spectrum("scan=1", 400.0, Some(4), vec![2])),
        ("scan=2", mzml_spectrum("scan=2", 400.0, None, vec![3, 2])),
        ("scan=3", mzml_spectrum("scan=3", 400.0, None, vec![])),
        ("scan=4", mzml_spectrum("scan=4", 400.0, None, vec![])),
    ]);
    let rows = vec![
        row("f.mzML", 1, "A", Some(1)),
        row("f.mzML", 2, "B", Some(1)),
        row("f.mzML", 3, "C", Some(1)),
        row("f.mzML", 4, "D", None),
    ];

    let records = resolve_with(&mut lookup, MZML_TEMPLATES, "f.mzML", &rows).unwrap();
    let charges: Vec<_> = records.iter().map(|r| r.charge).collect();
    assert_eq!(charges, vec![Some(4), Some(3), Some(1), None]);
}

#[test]
fn test_mzxml_charge_and_retention_time() {
    let scan = |charge, rt| MzXMLScan {
        retention_time: rt,
        precursors: vec![MzXMLPrecursor {
            mz: Some(600.25),
            charge,
            ..Default::default()
        }],
        ..Default::default()
    };
    let mut lookup = StubLookup::new(vec![
        ("10", scan(Some(2), Some(61.5))),
        ("11", scan(None, None)),
    ]);
    let rows = vec![
        row("run.mzXML", 10, "PEP", Some(3)),
        row("run.mzXML", 11, "TIDE", Some(3)),
    ];

    let records = resolve_with(&mut lookup, MZXML_TEMPLATES, "run.mzXML", &rows).unwrap();
    assert_eq!(records[0].charge, Some(2));
    assert_eq!(records[0].rt_seconds, Some(61.5));
    assert_eq!(records[1].charge, Some(3));
    assert_eq!(records[1].rt_seconds, None);
}

#[test]
fn test_no_matching_template() {
    let mut lookup = StubLookup::new(vec![("scan=1", mzml_spectrum("scan=1", 1.0, None, vec![]))]);
    let rows = vec![row("f.mzML", 1, "A", None), row("f.mzML", 2, "B", None)];

    match resolve_with(&mut lookup, MZML_TEMPLATES, "f.mzML", &rows).unwrap_err() {
        ResolveError::NoMatchingTemplate { templates, file } => {
            assert_eq!(
                templates,
                vec!["controllerType=0 controllerNumber=1 scan=%d", "scan=%d"]
            );
            assert_eq!(file, "f.mzML");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_missing_precursor_is_terminal() {
    let mut lookup = StubLookup::new(vec![("3", MzXMLScan::default())]);
    let rows = vec![row("run.mzXML", 3, "A", Some(2))];

    let err = resolve_with(&mut lookup, MZXML_TEMPLATES, "run.mzXML", &rows).unwrap_err();
    assert!(matches!(err, ResolveError::MissingPrecursor { scan: 3, .. }));
}

#[test]
fn test_reader_error_stops_template_search() {
    let rows = vec![row("run.mzXML", 3, "A", None)];
    let err = resolve_with(&mut FailingLookup, MZML_TEMPLATES, "run.mzXML", &rows).unwrap_err();
    assert!(matches!(err, ResolveError::Lookup(LookupError::MzXML(_))));
}

#[test]
fn test_short_lookup_result_is_an_error() {
    let rows = vec![row("run.mzXML", 3, "A", None), row("run.mzXML", 4, "B", None)];
    match resolve_with(&mut TruncatingLookup, MZXML_TEMPLATES, "run.mzXML", &rows).unwrap_err() {
        ResolveError::CountMismatch {
            requested,
            returned,
            file,
        } => {
            assert_eq!((requested, returned), (2, 1));
            assert_eq!(file, "run.mzXML");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_unsupported_extension() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run.raw");
    std::fs::write(&path, b"binary").unwrap();

    let err = resolve(&path, &[row("run.raw", 1, "A", None)]).unwrap_err();
    assert!(matches!(err, ResolveError::UnsupportedFormat(_)));
    assert!(err.to_string().starts_with("Unsupported file type:"));
}

#[test]
fn test_resolve_local_mzml_file() {
    let doc = r#"<?xml version="1.0" encoding="UTF-8"?>
<mzML version="1.1.0">
  <run id="r">
    <spectrumList count="1">
      <spectrum index="0" id="controllerType=0 controllerNumber=1 scan=5" defaultArrayLength="2">
        <cvParam cvRef="MS" accession="MS:1000511" name="ms level" value="2"/>
        <scanList count="1">
          <scan>
            <cvParam cvRef="MS" accession="MS:1000016" name="scan start time" value="2" unitCvRef="UO" unitAccession="UO:0000031" unitName="minute"/>
          </scan>
        </scanList>
        <precursorList count="1">
          <precursor>
            <selectedIonList count="1">
              <selectedIon>
                <cvParam cvRef="MS" accession="MS:1000744" name="selected ion m/z" value="445.12"/>
              </selectedIon>
            </selectedIonList>
          </precursor>
        </precursorList>
        <binaryDataArrayList count="2">
          <binaryDataArray>
            <cvParam cvRef="MS" accession="MS:1000523" name="64-bit float"/>
            <cvParam cvRef="MS" accession="MS:1000576" name="no compression"/>
            <cvParam cvRef="MS" accession="MS:1000514" name="m/z array"/>
            <binary>AAAAAAAAWUAAAAAAAABpQA==</binary>
          </binaryDataArray>
          <binaryDataArray>
            <cvParam cvRef="MS" accession="MS:1000521" name="32-bit float"/>
            <cvParam cvRef="MS" accession="MS:1000576" name="no compression"/>
            <cvParam cvRef="MS" accession="MS:1000515" name="intensity array"/>
            <binary>AADIQgAASEM=</binary>
          </binaryDataArray>
        </binaryDataArrayList>
      </spectrum>
    </spectrumList>
  </run>
</mzML>
"#;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("file.mzML");
    std::fs::File::create(&path)
        .unwrap()
        .write_all(doc.as_bytes())
        .unwrap();

    let records = resolve(&path, &[row("a/b/file.mzML", 5, "PEPTIDE", Some(2))]).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].title, "file.mzML:scan:5");
    assert_eq!(records[0].pepmass, 445.12);
    assert_eq!(records[0].charge, Some(2));
    // 2 minutes is written as 120 seconds, never as the raw cvParam value
    assert_eq!(records[0].rt_seconds, Some(120.0));
    assert_eq!(records[0].mz_array, vec![100.0, 200.0]);
    assert_eq!(records[0].intensity_array, vec![100.0, 200.0]);
}
