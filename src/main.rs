use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    dsa_tutor::cli::main()
}
