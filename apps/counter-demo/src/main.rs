use futures::channel::oneshot;
use futures::FutureExt;
use rendercycle_core::{
    completed, Component, ComponentId, Context, EventArgs, RenderBuilder, RenderFrame, RenderTree,
    Task, TaskError,
};
use rendercycle_runtime_std::StdRenderer;

struct CounterProps {
    title: String,
    step: i32,
}

struct CounterCard {
    title: String,
    step: i32,
    value: i32,
    saving: bool,
    saved: Option<i32>,
    save_gate: Option<oneshot::Receiver<()>>,
}

impl CounterCard {
    fn new(save_gate: oneshot::Receiver<()>) -> Self {
        Self {
            title: String::new(),
            step: 1,
            value: 0,
            saving: false,
            saved: None,
            save_gate: Some(save_gate),
        }
    }
}

impl Component for CounterCard {
    type Params = CounterProps;

    fn set_parameters(&mut self, props: CounterProps) {
        self.title = props.title;
        self.step = props.step;
    }

    fn build(&self, ctx: &Context<Self>, builder: &mut RenderBuilder) {
        builder.open("card").attribute("title", self.title.clone());
        builder.open("value").text(self.value.to_string()).close();
        builder
            .open("button")
            .text(format!("+{}", self.step))
            .on("increment", ctx.callback_sync(|card, _| card.value += card.step))
            .close();
        builder
            .open("button")
            .text(format!("-{}", self.step))
            .on("decrement", ctx.callback_sync(|card, _| card.value -= card.step))
            .close();

        let save_ctx = ctx.clone();
        builder
            .open("button")
            .text(if self.saving { "saving..." } else { "save" })
            .on(
                "save",
                ctx.callback(move |card, _| {
                    card.saving = true;
                    let value = card.value;
                    let gate = card.save_gate.take();
                    let ctx = save_ctx.clone();
                    async move {
                        if let Some(gate) = gate {
                            gate.await.map_err(|_| TaskError::Cancelled)?;
                        }
                        ctx.invoke(move |card: &mut CounterCard| {
                            card.saving = false;
                            card.saved = Some(value);
                        })
                        .await
                        .map_err(TaskError::failed)
                    }
                    .boxed_local()
                }),
            )
            .close();
        if let Some(saved) = self.saved {
            builder.open("status").text(format!("saved {saved}")).close();
        }
        builder.close();
    }

    fn on_render(&mut self, _ctx: &Context<Self>, first_render: bool) -> Task {
        if first_render {
            log::info!("counter card `{}`: first render cycle", self.title);
        }
        completed()
    }

    fn on_after_render(&mut self, _ctx: &Context<Self>, first_render: bool) -> Task {
        log::debug!(
            "counter card `{}`: rendered (first = {first_render})",
            self.title
        );
        completed()
    }

    // Stepping by zero cannot change what is shown.
    fn should_render(&self) -> bool {
        self.step != 0
    }
}

fn describe(tree: &RenderTree) -> String {
    let mut out = String::new();
    let mut depth = 0usize;
    for frame in tree.frames() {
        match frame {
            RenderFrame::Open(tag) => {
                out.push_str(&format!("{}<{tag}>\n", "  ".repeat(depth)));
                depth += 1;
            }
            RenderFrame::Close => depth = depth.saturating_sub(1),
            RenderFrame::Text(text) => {
                out.push_str(&format!("{}{text}\n", "  ".repeat(depth)));
            }
            RenderFrame::Attribute { name, value } => {
                out.push_str(&format!("{}@{name}={value}\n", "  ".repeat(depth)));
            }
            RenderFrame::Handler { event, .. } => {
                out.push_str(&format!("{}on:{event}\n", "  ".repeat(depth)));
            }
        }
    }
    out
}

fn show(renderer: &StdRenderer, id: ComponentId, step: &str) {
    println!("--- {step} (renders: {})", renderer.render_count(id));
    match renderer.rendered(id) {
        Some(tree) => print!("{}", describe(&tree)),
        None => println!("(nothing rendered)"),
    }
}

fn fire(renderer: &StdRenderer, id: ComponentId, event: &str) {
    if let Err(err) = renderer.dispatch_event(id, event, EventArgs::Empty) {
        log::error!("failed to dispatch `{event}`: {err}");
        return;
    }
    renderer.flush();
}

fn main() {
    env_logger::init();

    println!("=== rendercycle counter demo ===");
    let renderer = StdRenderer::new();
    let (finish_save, save_gate) = oneshot::channel();
    let card = match renderer.mount(CounterCard::new(save_gate)) {
        Ok(card) => card,
        Err(err) => {
            log::error!("failed to mount counter card: {err}");
            return;
        }
    };
    let Some(id) = card.component_id() else {
        log::error!("counter card was not attached");
        return;
    };

    renderer.spawn(card.update(CounterProps {
        title: "Clicks".into(),
        step: 1,
    }));
    renderer.flush();
    show(&renderer, id, "first update");

    for event in ["increment", "increment", "decrement"] {
        fire(&renderer, id, event);
    }
    show(&renderer, id, "after +1 +1 -1");

    renderer.spawn(card.update(CounterProps {
        title: "Clicks".into(),
        step: 5,
    }));
    renderer.flush();
    fire(&renderer, id, "increment");
    show(&renderer, id, "step 5, +5");

    fire(&renderer, id, "save");
    show(&renderer, id, "save in flight");
    if finish_save.send(()).is_err() {
        log::warn!("save already abandoned");
    }
    renderer.flush();
    show(&renderer, id, "save finished");

    renderer.spawn(card.update(CounterProps {
        title: "Frozen".into(),
        step: 0,
    }));
    renderer.flush();
    show(&renderer, id, "step 0 declines the render");

    renderer.spawn(card.reset());
    renderer.flush();
    show(&renderer, id, "reset forces a render");

    for err in renderer.take_errors() {
        log::error!("lifecycle failure: {err}");
    }
}
