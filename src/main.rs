use snailfish::{open_utf8_file, Args, Homework, Parser, SnailfishNumber};

fn main() {
    let args: Args = Args::parse();
    let input_file_path: &str = args.input_file_path("input/homework.txt");

    if let Err(err) =
        // SAFETY: This operation is unsafe, we're just hoping nobody else touches the file while
        // this program is executing
        unsafe {
            open_utf8_file(
                input_file_path,
                |input: &str| match Homework::try_from(input) {
                    Ok(homework) => {
                        let sum: SnailfishNumber = homework.sum();

                        if args.verbose {
                            dbg!(&sum);
                        }

                        dbg!(sum.magnitude());
                        dbg!(homework.try_max_pairwise_magnitude());
                    }
                    Err(error) => {
                        panic!("{error:#?}")
                    }
                },
            )
        }
    {
        eprintln!(
            "Encountered error {} when opening file \"{}\"",
            err, input_file_path
        );
    }
}
