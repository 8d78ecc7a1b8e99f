#[test]
fn diversity() {
    trycmd::TestCases::new()
        .case("tests/diversity/*.toml")
        .default_bin_name("clonal");
}

#[test]
fn overlap() {
    trycmd::TestCases::new()
        .case("tests/overlap/*.toml")
        .default_bin_name("clonal");
}
