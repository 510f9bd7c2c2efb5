use shopchat_core::order::ORDER_SENTINEL;

/// Fixed sales-assistant instruction with an optional product list spliced in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PromptTemplate {
    shop_name: String,
}

impl PromptTemplate {
    pub fn new(shop_name: impl Into<String>) -> Self {
        Self { shop_name: shop_name.into() }
    }

    pub fn shop_name(&self) -> &str {
        &self.shop_name
    }

    /// The instruction block. `catalog` is inserted verbatim, including when it
    /// is the catalog load-error text.
    pub fn instruction(&self, catalog: Option<&str>) -> String {
        let mut instruction = format!("You are a helpful sales assistant for '{}'.\n", self.shop_name);

        if let Some(catalog) = catalog {
            instruction.push_str("Here is our product list:\n");
            instruction.push_str(catalog);
            instruction.push_str(
                "\n\nOnly recommend products from this list and quote prices exactly as listed.\n",
            );
        }

        instruction.push_str(&format!(
            "Answer questions briefly.\n\
             \n\
             IMPORTANT LOGIC:\n\
             If the user confirms they want to buy or place an order:\n\
             1. Start your reply with \"{ORDER_SENTINEL}\"\n\
             2. Then write a short summary of the order.\n\
             3. Example: \"{ORDER_SENTINEL} I would like to buy 1 Red Shoe.\"\n\
             \n\
             If they are just chatting, just reply normally.\n"
        ));
        instruction
    }

    /// Full prompt handed to the model for one chat turn.
    pub fn compose(&self, catalog: Option<&str>, user_message: &str) -> String {
        format!("{}\nUser: {user_message}\nAssistant:", self.instruction(catalog))
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::new("My Shop")
    }
}
