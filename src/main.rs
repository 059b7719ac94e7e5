fn main() {
    ert_tomo::cli::run();
}
