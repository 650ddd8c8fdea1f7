use std::io;
use xiangqi_arena::display_format::DisplayFormat;
use xiangqi_arena::game::Game;

fn main() -> io::Result<()> {
    let mut game = Game::opening();

    loop {
        println!("{}", game.display(DisplayFormat::pretty()));

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            return Ok(());
        }
        let input = input.trim();

        match input {
            "quit" => return Ok(()),
            "undo" => {
                if !game.undo() {
                    println!("nothing to undo");
                }
            }
            "reset" => game.reset(),
            "moves" => println!("{}", game.legal_moves().join(" ")),
            "eval" => println!("{:+.2}", game.evaluate()),
            "history" => println!("{}", game.transcript()),
            _ => {
                if let Err(err) = game.try_apply(input) {
                    println!("{err}");
                }
            }
        }
    }
}
