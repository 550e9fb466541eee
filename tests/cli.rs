/// End-to-end tests of the mitoscaf binary
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Deterministic pseudo-random nucleotides
fn random_seq(seed: u64, len: usize) -> String {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    (0..len)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            b"ACGT"[(state >> 62) as usize] as char
        })
        .collect()
}

fn write_fasta(path: &Path, records: &[(&str, f64, &str)]) {
    let mut file = fs::File::create(path).unwrap();
    for (id, multi, seq) in records {
        writeln!(file, ">{} flag=1 multi={} len={}", id, multi, seq.len()).unwrap();
        writeln!(file, "{}", seq).unwrap();
    }
}

fn prefix(dir: &TempDir) -> String {
    format!("{}/", dir.path().display())
}

fn mitoscaf() -> Command {
    Command::cargo_bin("mitoscaf").unwrap()
}

/// Two contigs whose ends overlap by 50 bp
fn create_overlapping_pool(dir: &TempDir) -> PathBuf {
    let a = random_seq(1, 200);
    let b = format!("{}{}", &a[150..], random_seq(2, 150));
    let path = dir.path().join("pool.fa");
    write_fasta(&path, &[("A", 20.0, &a), ("B", 15.0, &b)]);
    path
}

#[test]
fn test_merge_sequences() {
    let tmpdir = TempDir::new().unwrap();
    let pool = create_overlapping_pool(&tmpdir);

    mitoscaf()
        .arg("--runMode")
        .arg("mergeSequences")
        .arg("--contigsIn")
        .arg(&pool)
        .arg("--outFileNamePrefix")
        .arg(prefix(&tmpdir))
        .assert()
        .success();

    let merged = fs::read_to_string(tmpdir.path().join("merged.fa")).unwrap();
    assert!(merged.starts_with(">M0 flag=1 multi=32767 len=350"));
    assert_eq!(merged.matches('>').count(), 1);
}

#[test]
fn test_merge_partial() {
    let tmpdir = TempDir::new().unwrap();
    let p = random_seq(3, 300);
    let r = format!("{}{}", random_seq(4, 200), &p[..60]);
    let pool = tmpdir.path().join("picked.fa");
    let reference = tmpdir.path().join("reference.fa");
    write_fasta(&pool, &[("P", 30.0, &p)]);
    write_fasta(&reference, &[("R", 12.0, &r)]);

    mitoscaf()
        .arg("--runMode")
        .arg("mergePartial")
        .arg("--contigsIn")
        .arg(&pool)
        .arg("--referenceIn")
        .arg(&reference)
        .arg("--outFileNamePrefix")
        .arg(prefix(&tmpdir))
        .assert()
        .success();

    let merged = fs::read_to_string(tmpdir.path().join("merged.fa")).unwrap();
    assert!(merged.starts_with(">M0 flag=1 multi=32767 len=500"));
}

#[test]
fn test_wash_hits() {
    let tmpdir = TempDir::new().unwrap();
    let hits = tmpdir.path().join("hits.tsv");
    fs::write(
        &hits,
        "\
a_b_c_cox1_Homo_sapiens\tS1\t90\t500\t10\t0\t1\t500\t101\t1600\t1e-100\t900
a_b_c_cox1_Mus_musculus\tS1\t85\t480\t20\t0\t1\t480\t120\t1560\t1e-90\t800
a_b_c_nad1_Homo_sapiens\tS1\t70\t300\t40\t0\t1\t300\t1700\t2600\t1e-40\t300
",
    )
    .unwrap();

    mitoscaf()
        .arg("--runMode")
        .arg("washHits")
        .arg("--hitsIn")
        .arg(&hits)
        .arg("--outFileNamePrefix")
        .arg(prefix(&tmpdir))
        .assert()
        .success();

    let washed = fs::read_to_string(tmpdir.path().join("washed.csv")).unwrap();
    let lines: Vec<&str> = washed.lines().collect();
    assert!(lines[0].starts_with("qseq,sseq,ident,length"));
    // the second cox1 hit sits inside the first one
    assert_eq!(lines.len(), 3);
    assert!(lines[1].starts_with("a_b_c_cox1_Homo_sapiens,S1"));
    assert!(lines[2].starts_with("a_b_c_nad1_Homo_sapiens,S1"));
}

#[test]
fn test_find_scaffolds() {
    let tmpdir = TempDir::new().unwrap();

    let contigs = tmpdir.path().join("contigs.fa");
    write_fasta(
        &contigs,
        &[
            ("S1", 50.0, &random_seq(5, 2000)),
            ("S2", 20.0, &random_seq(6, 1000)),
            ("S3", 3.0, &random_seq(7, 800)),
        ],
    );

    let required = tmpdir.path().join("required_cds.json");
    fs::write(
        &required,
        r#"{"Animal": {"cox1": 1500, "nad1": 900, "atp8": 160}, "Plant": {"cox1": 1500}}"#,
    )
    .unwrap();

    let hits = tmpdir.path().join("profile.tsv");
    fs::write(
        &hits,
        "\
a_b_c_cox1_Homo_sapiens\tS1\t90\t1500\t10\t0\t1\t1500\t101\t1600\t0\t2000
a_b_c_nad1_Homo_sapiens\tS2\t80\t900\t30\t0\t1\t900\t51\t950\t0\t1200
a_b_c_atp8_Homo_sapiens\tS3\t80\t160\t10\t0\t1\t160\t1\t160\t1e-30\t200
",
    )
    .unwrap();

    mitoscaf()
        .arg("--runMode")
        .arg("findScaffolds")
        .arg("--hitsIn")
        .arg(&hits)
        .arg("--contigsIn")
        .arg(&contigs)
        .arg("--requiredGenesIn")
        .arg(&required)
        .arg("--clade")
        .arg("Animal")
        .arg("--mergeMethod")
        .arg("none")
        .arg("--outFileNamePrefix")
        .arg(prefix(&tmpdir))
        .assert()
        .success();

    let json: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(tmpdir.path().join("candidates.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(json["cox1"], "S1");
    assert_eq!(json["nad1"], "S2");
    // S3 is below the abundance floor
    assert!(json["atp8"].is_null());

    let picked = fs::read_to_string(tmpdir.path().join("picked.fa")).unwrap();
    assert_eq!(picked.matches('>').count(), 2);
    let low = fs::read_to_string(tmpdir.path().join("abundance.low.fa")).unwrap();
    assert!(low.starts_with(">S3"));
}

#[test]
fn test_find_scaffolds_extends_picked_with_unhit_contig() {
    let tmpdir = TempDir::new().unwrap();
    let s1 = random_seq(9, 2000);
    // no profile hit and below the abundance floor, but its end overlaps S1
    let r = format!("{}{}", random_seq(10, 200), &s1[..60]);

    let contigs = tmpdir.path().join("contigs.fa");
    write_fasta(&contigs, &[("S1", 50.0, &s1), ("R", 4.0, &r)]);
    let required = tmpdir.path().join("required_cds.json");
    fs::write(&required, r#"{"Animal": {"cox1": 1500}}"#).unwrap();
    let hits = tmpdir.path().join("profile.tsv");
    fs::write(
        &hits,
        "a_b_c_cox1_Homo_sapiens\tS1\t90\t1500\t10\t0\t1\t1500\t101\t1600\t0\t2000\n",
    )
    .unwrap();

    mitoscaf()
        .arg("--runMode")
        .arg("findScaffolds")
        .arg("--hitsIn")
        .arg(&hits)
        .arg("--contigsIn")
        .arg(&contigs)
        .arg("--requiredGenesIn")
        .arg(&required)
        .arg("--clade")
        .arg("Animal")
        .arg("--outFileNamePrefix")
        .arg(prefix(&tmpdir))
        .assert()
        .success();

    let picked = fs::read_to_string(tmpdir.path().join("picked.fa")).unwrap();
    assert!(picked.starts_with(">M0 flag=1 multi=32767 len=2200"));
    assert_eq!(picked.matches('>').count(), 1);
    let seq: String = picked.lines().skip(1).collect();
    assert_eq!(seq, format!("{}{}", r, &s1[60..]));
}

#[test]
fn test_find_scaffolds_with_taxonomy_filter() {
    let tmpdir = TempDir::new().unwrap();

    let contigs = tmpdir.path().join("contigs.fa");
    write_fasta(
        &contigs,
        &[
            ("S1", 50.0, &random_seq(11, 2000)),
            ("S2", 20.0, &random_seq(12, 1000)),
        ],
    );
    let required = tmpdir.path().join("required_cds.json");
    fs::write(&required, r#"{"Animal": {"cox1": 1500, "nad1": 900}}"#).unwrap();
    let hits = tmpdir.path().join("profile.tsv");
    fs::write(
        &hits,
        "\
a_b_c_cox1_Homo_sapiens\tS1\t90\t1500\t10\t0\t1\t1500\t101\t1600\t0\t2000
a_b_c_nad1_Homo_sapiens\tS2\t80\t900\t30\t0\t1\t900\t51\t950\t0\t1200
",
    )
    .unwrap();

    // S1 is supported by an insect protein, S2 only by a human one
    let taxa_hits = tmpdir.path().join("taxa.tsv");
    fs::write(
        &taxa_hits,
        "\
a_b_c_cox1_Drosophila_melanogaster\tS1\t85\t500\t10\t0\t1\t500\t101\t1600\t1e-100\t900
a_b_c_nad1_Homo_sapiens\tS2\t80\t300\t20\t0\t1\t300\t51\t950\t1e-80\t700
",
    )
    .unwrap();
    let lineages = tmpdir.path().join("lineages.tsv");
    fs::write(
        &lineages,
        "\
name\tkingdom\tphylum\tclass\torder\tfamily\tgenus\tspecies
Insecta\tMetazoa\tArthropoda\tInsecta\tNA\tNA\tNA\tNA
Drosophila melanogaster\tMetazoa\tArthropoda\tInsecta\tDiptera\tDrosophilidae\tDrosophila\tDrosophila melanogaster
Homo sapiens\tMetazoa\tChordata\tMammalia\tPrimates\tHominidae\tHomo\tHomo sapiens
",
    )
    .unwrap();

    mitoscaf()
        .arg("--runMode")
        .arg("findScaffolds")
        .arg("--hitsIn")
        .arg(&hits)
        .arg("--contigsIn")
        .arg(&contigs)
        .arg("--requiredGenesIn")
        .arg(&required)
        .arg("--clade")
        .arg("Animal")
        .arg("--taxa")
        .arg("Insecta")
        .arg("--taxaHitsIn")
        .arg(&taxa_hits)
        .arg("--lineageIn")
        .arg(&lineages)
        .arg("--mergeMethod")
        .arg("none")
        .arg("--outFileNamePrefix")
        .arg(prefix(&tmpdir))
        .assert()
        .success();

    let taxa = fs::read_to_string(tmpdir.path().join("taxa.csv")).unwrap();
    let lines: Vec<&str> = taxa.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[1].starts_with("a_b_c_cox1_Drosophila_melanogaster,S1"));

    let json: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(tmpdir.path().join("candidates.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(json["cox1"], "S1");
    assert!(json["nad1"].is_null());
}

const CLOVER: &str = "(((((((,,<<<<_______>>>>,<<<<<_______>>>>>,,,,<<<<<_______>>>>>))))))):";

/// Structural hit TSV row whose anticodon arm reads `anticodon`
fn trna_row(anticodon: &str, from: i64, to: i64, score: f64) -> String {
    let mut seq: Vec<u8> = "G".repeat(CLOVER.len()).into_bytes();
    seq[30..37].copy_from_slice(format!("CT{anticodon}AA").as_bytes());
    format!(
        "mt\t{}\t{}\t{}\t{}\t{}\n",
        from,
        to,
        score,
        CLOVER,
        String::from_utf8(seq).unwrap()
    )
}

#[test]
fn test_resolve_trna() {
    let tmpdir = TempDir::new().unwrap();
    let hits = tmpdir.path().join("trna_hits.tsv");
    let mut text = String::from("target\tseqfrom\tseqto\tscore\tstructure\tsequence\n");
    text.push_str(&trna_row("TAA", 100, 171, 60.5)); // L
    text.push_str(&trna_row("GAT", 125, 195, 40.5)); // I, overlaps L
    text.push_str(&trna_row("TGA", 300, 370, 20.5)); // S
    fs::write(&hits, text).unwrap();

    mitoscaf()
        .arg("--runMode")
        .arg("resolveTrna")
        .arg("--trnaHitsIn")
        .arg(&hits)
        .arg("--geneticCode")
        .arg("5")
        .arg("--outFileNamePrefix")
        .arg(prefix(&tmpdir))
        .assert()
        .success();

    let report = fs::read_to_string(tmpdir.path().join("trna.tsv")).unwrap();
    let lines: Vec<&str> = report.lines().collect();
    assert_eq!(lines[0], "slot\ttarget_id\tseqfrom\tseqto\tscore\tamino");
    assert_eq!(lines[1], "L\tmt\t100\t171\t60.5\tL");
    assert_eq!(lines[2], "S\tmt\t300\t370\t20.5\tS");
    assert_eq!(lines.len(), 4);
    assert!(lines[3].starts_with("# missing: "));
    assert!(lines[3].contains('I'));
}

#[test]
fn test_unknown_clade_fails() {
    let tmpdir = TempDir::new().unwrap();
    let contigs = tmpdir.path().join("contigs.fa");
    write_fasta(&contigs, &[("S1", 50.0, &random_seq(8, 500))]);
    let required = tmpdir.path().join("required_cds.json");
    fs::write(&required, r#"{"Animal": {"cox1": 1500}}"#).unwrap();
    let hits = tmpdir.path().join("profile.tsv");
    fs::write(
        &hits,
        "a_b_c_cox1_Homo_sapiens\tS1\t90\t400\t10\t0\t1\t400\t1\t400\t0\t600\n",
    )
    .unwrap();

    mitoscaf()
        .arg("--runMode")
        .arg("findScaffolds")
        .arg("--hitsIn")
        .arg(&hits)
        .arg("--contigsIn")
        .arg(&contigs)
        .arg("--requiredGenesIn")
        .arg(&required)
        .arg("--clade")
        .arg("Fungi")
        .arg("--outFileNamePrefix")
        .arg(prefix(&tmpdir))
        .assert()
        .failure()
        .stderr(predicate::str::contains("clade 'Fungi'"));
}

#[test]
fn test_missing_input_is_rejected() {
    mitoscaf()
        .arg("--runMode")
        .arg("resolveTrna")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--trnaHitsIn is required"));
}

#[test]
fn test_unknown_run_mode() {
    mitoscaf()
        .arg("--runMode")
        .arg("alignReads")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown runMode"));
}
