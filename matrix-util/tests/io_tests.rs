use matrix_util::common_io::{create_temp_dir_file, write_lines};
use matrix_util::traits::{IoOps, SampleOps};
use rand::rngs::SmallRng;
use rand::SeedableRng;

#[test]
fn dmatrix_io_test() -> anyhow::Result<()> {
    let mut rng = SmallRng::seed_from_u64(3);
    let xx = nalgebra::DMatrix::<f64>::runif_with(50, 30, &mut rng);

    let tsv_file = create_temp_dir_file("txt.gz")?;
    xx.to_tsv(tsv_file.to_str().unwrap())?;

    let yy = nalgebra::DMatrix::<f64>::read_file_delim(tsv_file.to_str().unwrap(), "\t", None)?;

    approx::assert_abs_diff_eq!(xx, yy);

    Ok(())
}

#[test]
fn dmatrix_csv_with_header_and_comments() -> anyhow::Result<()> {
    let csv_file = create_temp_dir_file("csv")?;
    let lines: Vec<Box<str>> = vec![
        "# generated by hand".into(),
        "a,b,c".into(),
        "1,2,3".into(),
        "4,5,6".into(),
    ];
    write_lines(&lines, csv_file.to_str().unwrap())?;

    let xx = nalgebra::DMatrix::<f64>::read_file_delim(csv_file.to_str().unwrap(), ",", Some(0))?;

    assert_eq!(xx.shape(), (2, 3));
    assert_eq!(xx[(1, 2)], 6.0);
    Ok(())
}

#[test]
fn whitespace_delimited_matrix() -> anyhow::Result<()> {
    let txt_file = create_temp_dir_file("txt")?;
    let lines: Vec<Box<str>> = vec!["1  2\t3".into(), " 4 5 6 ".into()];
    write_lines(&lines, txt_file.to_str().unwrap())?;

    let xx = nalgebra::DMatrix::<f64>::read_file_delim(txt_file.to_str().unwrap(), &[' ', '\t'], None)?;

    assert_eq!(xx.shape(), (2, 3));
    assert_eq!(xx[(1, 0)], 4.0);
    Ok(())
}

#[test]
fn ragged_and_malformed_rows_are_errors() -> anyhow::Result<()> {
    let ragged = create_temp_dir_file("tsv")?;
    let lines: Vec<Box<str>> = vec!["1\t2\t3".into(), "4\t5".into()];
    write_lines(&lines, ragged.to_str().unwrap())?;
    assert!(nalgebra::DMatrix::<f64>::from_tsv(ragged.to_str().unwrap(), None).is_err());

    let malformed = create_temp_dir_file("tsv")?;
    let lines: Vec<Box<str>> = vec!["1\tx".into()];
    write_lines(&lines, malformed.to_str().unwrap())?;
    assert!(nalgebra::DMatrix::<f64>::from_tsv(malformed.to_str().unwrap(), None).is_err());
    Ok(())
}
