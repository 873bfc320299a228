fn main() {
    let result = roi_rs::init_logging().and_then(|()| roi_rs::run_cli());

    if let Err(error) = result {
        eprintln!("{error}");
        std::process::exit(1);
    }
}
